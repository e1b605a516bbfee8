use serde::{Deserialize, Serialize};

use crate::balance::Balance;
use crate::core_types::{Amount, Odds, UserId};
use crate::error::LedgerError;
use crate::wager::state::{Outcome, PendingBet};

/// UserAccount represents one community member's wallet.
///
/// # Invariants (enforced by private fields):
/// 1. user_id is immutable after creation
/// 2. balance is only mutated through validated operations
/// 3. at most one pending bet; a second escrow is rejected, never overwritten
/// 4. every method either succeeds or leaves the account untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    user_id: UserId,                 // PRIVATE - use user_id()
    display_name: String,            // advisory only
    balance: Balance,                // PRIVATE - use balance()
    pending_bet: Option<PendingBet>, // PRIVATE - escrowed stake awaiting resolution
}

impl UserAccount {
    pub fn new(user_id: UserId, display_name: impl Into<String>, opening: Amount) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            balance: Balance::new(opening),
            pending_bet: None,
        }
    }

    #[inline(always)]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline(always)]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[inline(always)]
    pub fn balance(&self) -> Balance {
        self.balance
    }

    #[inline(always)]
    pub fn pending_bet(&self) -> Option<PendingBet> {
        self.pending_bet
    }

    pub fn rename(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    // ============================================================
    // DIRECT BALANCE OPERATIONS
    // ============================================================

    pub fn deposit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance.deposit(amount).map_err(|_| LedgerError::Overflow)
    }

    pub fn spend(&mut self, amount: Amount) -> Result<(), LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.balance.spend(amount).map_err(|_| LedgerError::Overflow)
    }

    pub fn set_balance(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance.set(amount).map_err(|_| LedgerError::Overflow)
    }

    // ============================================================
    // BET LIFECYCLE
    // ============================================================

    /// Withdraw the stake and record it as the pending bet.
    ///
    /// The stake leaves the balance even when that drives it negative.
    pub fn escrow(&mut self, amount: Amount) -> Result<PendingBet, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if self.pending_bet.is_some() {
            return Err(LedgerError::BetAlreadyPending(self.user_id));
        }
        self.spend(amount)?;
        let bet = PendingBet::new(amount.unsigned_abs());
        self.pending_bet = Some(bet);
        Ok(bet)
    }

    pub fn attach_odds(&mut self, odds: Odds) -> Result<PendingBet, LedgerError> {
        if odds == 0 {
            return Err(LedgerError::InvalidOdds);
        }
        let bet = self
            .pending_bet
            .as_mut()
            .ok_or(LedgerError::NoPendingBet(self.user_id))?;
        bet.odds = odds;
        Ok(*bet)
    }

    /// Drop the pending bet without moving the balance.
    ///
    /// Only for callers that have already accounted for the stake, such as
    /// a restore that overwrites the balance with a refunded value.
    pub fn abandon_bet(&mut self) -> Option<PendingBet> {
        self.pending_bet.take()
    }

    /// Apply the terminal outcome to the pending bet and clear it.
    ///
    /// Returns the bet and the amount credited. On error the bet stays
    /// escrowed so the caller can still refund it.
    pub fn settle(&mut self, outcome: Outcome) -> Result<(PendingBet, Amount), LedgerError> {
        let bet = self
            .pending_bet
            .ok_or(LedgerError::NoPendingBet(self.user_id))?;

        let credit = match outcome {
            Outcome::Win => {
                if bet.odds == 0 {
                    return Err(LedgerError::OddsNotSet(self.user_id));
                }
                bet.payout().ok_or(LedgerError::Overflow)?
            }
            Outcome::Lose => 0,
            Outcome::Invalid => bet.stake().ok_or(LedgerError::Overflow)?,
        };

        if credit > 0 {
            self.deposit(credit)?;
        }
        self.pending_bet = None;
        Ok((bet, credit))
    }
}
