/// ENFORCED BALANCE TYPE - Used by AccountStore
///
/// This is the SINGLE source of truth for balance arithmetic.
/// ALL balance mutations MUST go through these methods.
///
/// # Enforcement Strategy:
/// 1. Fields are PRIVATE - no direct access
/// 2. All mutations return Result - errors are explicit
/// 3. Version auto-increments - audit trail
/// 4. checked_add/sub - overflow protection
use serde::{Deserialize, Serialize};

use crate::core_types::Amount;

/// Balance of a single wallet
///
/// # Invariants (ENFORCED by private fields):
/// - `amount` may be negative (debt is allowed), but never wraps
/// - `version` increments on every successful mutation
/// - A failed mutation leaves both fields unchanged
///
/// # Usage:
/// ```ignore
/// let mut balance = Balance::new(100);
/// balance.spend(130)?;     // amount = -30, version = 1
/// balance.deposit(60)?;    // amount = 30,  version = 2
/// balance.set(100)?;       // amount = 100, version = 3
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Balance {
    amount: Amount, // PRIVATE - ONLY modified through deposit/spend/set
    version: u64,   // PRIVATE - Incremented on every mutation
}

impl Balance {
    /// Opening balance. Version starts at zero.
    pub const fn new(amount: Amount) -> Self {
        Self { amount, version: 0 }
    }

    // ============================================================
    // READ-ONLY GETTERS
    // ============================================================

    #[inline(always)]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    #[inline(always)]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[inline(always)]
    pub const fn is_debt(&self) -> bool {
        self.amount < 0
    }

    // ============================================================
    // VALIDATED MUTATIONS
    // ============================================================

    /// Credit funds.
    ///
    /// # Errors
    /// - "Negative deposit" if amount < 0
    /// - "Deposit overflow" on arithmetic overflow
    pub fn deposit(&mut self, amount: Amount) -> Result<(), &'static str> {
        if amount < 0 {
            return Err("Negative deposit");
        }
        self.amount = self.amount.checked_add(amount).ok_or("Deposit overflow")?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Debit funds unconditionally. The result may be negative.
    ///
    /// # Errors
    /// - "Negative spend" if amount < 0
    /// - "Spend underflow" if the result does not fit in an i64
    pub fn spend(&mut self, amount: Amount) -> Result<(), &'static str> {
        if amount < 0 {
            return Err("Negative spend");
        }
        self.amount = self.amount.checked_sub(amount).ok_or("Spend underflow")?;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }

    /// Administrative override to an absolute value, regardless of sign.
    pub fn set(&mut self, amount: Amount) -> Result<(), &'static str> {
        self.amount = amount;
        self.version = self.version.wrapping_add(1);
        Ok(())
    }
}
