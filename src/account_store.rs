//! AccountStore - authoritative home for all wallet balances
//!
//! # Thread Safety
//!
//! Each account sits behind its own `Mutex`; the `DashMap` is only touched
//! long enough to look up or create the account handle. This gives:
//! - Operations on different users proceed in parallel
//! - Operations on one user are linearizable (total order, no lost updates)
//! - No store-wide lock on the mutation path
//!
//! Lock order is always map shard → released → account guard. No code path
//! touches the map while holding an account guard.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use tracing::debug;

use crate::balance::Balance;
use crate::core_types::{Amount, UserId};
use crate::error::LedgerError;
use crate::ledger::{AuditLog, LedgerOp};
use crate::user_account::UserAccount;
use crate::wager::state::PendingBet;

type AccountHandle = Arc<Mutex<UserAccount>>;

/// Point-in-time copy of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub user_id: UserId,
    pub display_name: String,
    pub balance: Amount,
    pub version: u64,
    pub pending_bet: Option<PendingBet>,
}

impl From<&UserAccount> for AccountSnapshot {
    fn from(account: &UserAccount) -> Self {
        Self {
            user_id: account.user_id(),
            display_name: account.display_name().to_string(),
            balance: account.balance().amount(),
            version: account.balance().version(),
            pending_bet: account.pending_bet(),
        }
    }
}

pub struct AccountStore {
    accounts: DashMap<UserId, AccountHandle, FxBuildHasher>,
    audit: Option<Arc<AuditLog>>,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::with_hasher(FxBuildHasher),
            audit: None,
        }
    }

    /// Store that journals every balance change into `audit`.
    pub fn with_audit(audit: Arc<AuditLog>) -> Self {
        Self {
            accounts: DashMap::with_hasher(FxBuildHasher),
            audit: Some(audit),
        }
    }

    pub fn audit(&self) -> Option<&Arc<AuditLog>> {
        self.audit.as_ref()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.accounts.contains_key(&user_id)
    }

    // ============================================================
    // CREATION
    // ============================================================

    /// Return the account, creating it on first sight.
    ///
    /// An existing account is returned unchanged; `display_name` and
    /// `starting_balance` only apply on creation.
    pub fn get_or_create(
        &self,
        user_id: UserId,
        display_name: &str,
        starting_balance: Amount,
    ) -> AccountSnapshot {
        self.open(user_id, display_name, starting_balance).0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// this call inserted the account. Exactly one of any number of racing
    /// callers sees `true`.
    pub fn open(
        &self,
        user_id: UserId,
        display_name: &str,
        starting_balance: Amount,
    ) -> (AccountSnapshot, bool) {
        let (handle, created) = match self.accounts.entry(user_id) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                debug!(user_id, display_name, starting_balance, "Account created");
                if let Some(audit) = &self.audit {
                    audit.record(
                        user_id,
                        LedgerOp::Open,
                        i128::from(starting_balance),
                        starting_balance,
                        0,
                    );
                }
                let handle = Arc::new(Mutex::new(UserAccount::new(
                    user_id,
                    display_name,
                    starting_balance,
                )));
                entry.insert(Arc::clone(&handle));
                (handle, true)
            }
        };
        let account = lock(&handle);
        (AccountSnapshot::from(&*account), created)
    }

    // ============================================================
    // ATOMIC MUTATIONS
    // ============================================================

    pub fn deposit(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        self.update(user_id, LedgerOp::Deposit, |account| {
            account.deposit(amount)?;
            Ok(account.balance().amount())
        })
    }

    /// Debit unconditionally; the balance may go negative.
    pub fn spend(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        self.update(user_id, LedgerOp::Spend, |account| {
            account.spend(amount)?;
            Ok(account.balance().amount())
        })
    }

    pub fn set_balance(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        self.update(user_id, LedgerOp::SetBalance, |account| {
            account.set_balance(amount)?;
            Ok(account.balance().amount())
        })
    }

    pub fn rename(&self, user_id: UserId, display_name: &str) -> Result<(), LedgerError> {
        self.modify(user_id, |account| {
            account.rename(display_name);
            Ok(())
        })
    }

    /// Run `f` under the account guard for changes that leave the balance
    /// alone (labels, odds). Nothing is journaled.
    pub fn modify<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut UserAccount) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let handle = self.handle(user_id)?;
        let mut account = lock(&handle);
        let before = account.balance();
        let out = f(&mut *account)?;
        debug_assert_eq!(
            account.balance(),
            before,
            "modify() must not move the balance"
        );
        Ok(out)
    }

    /// Run `f` against the account under its guard.
    ///
    /// `f` must leave the account untouched when it returns an error. If the
    /// balance changed, one journal entry tagged `op` is recorded before the
    /// guard is released.
    pub fn update<T>(
        &self,
        user_id: UserId,
        op: LedgerOp,
        f: impl FnOnce(&mut UserAccount) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let handle = self.handle(user_id)?;
        let mut account = lock(&handle);
        let before = account.balance();
        let out = f(&mut *account)?;
        self.journal(&*account, op, before);
        Ok(out)
    }

    // ============================================================
    // READS
    // ============================================================

    pub fn snapshot(&self, user_id: UserId) -> Result<Amount, LedgerError> {
        let handle = self.handle(user_id)?;
        let balance = lock(&handle).balance().amount();
        Ok(balance)
    }

    pub fn account(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerError> {
        let handle = self.handle(user_id)?;
        let account = lock(&handle);
        Ok(AccountSnapshot::from(&*account))
    }

    /// Every account, sorted by user id. Each entry is individually
    /// consistent; the set as a whole is not a global point-in-time cut.
    pub fn accounts(&self) -> Vec<AccountSnapshot> {
        let handles: Vec<AccountHandle> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<AccountSnapshot> = handles
            .iter()
            .map(|handle| AccountSnapshot::from(&*lock(handle)))
            .collect();
        snapshots.sort_by_key(|s| s.user_id);
        snapshots
    }

    // ============================================================
    // INTERNALS
    // ============================================================

    fn handle(&self, user_id: UserId) -> Result<AccountHandle, LedgerError> {
        self.accounts
            .get(&user_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::UnknownAccount(user_id))
    }

    fn journal(&self, account: &UserAccount, op: LedgerOp, before: Balance) {
        let after = account.balance();
        if after.version() == before.version() {
            return;
        }
        let delta = i128::from(after.amount()) - i128::from(before.amount());
        debug!(
            user_id = account.user_id(),
            op = %op,
            delta,
            balance = after.amount(),
            version = after.version(),
            "Balance changed"
        );
        if let Some(audit) = &self.audit {
            audit.record(account.user_id(), op, delta, after.amount(), after.version());
        }
    }
}

/// A panic inside another holder cannot leave a half-applied mutation
/// (every mutation validates before writing), so poison is ignored.
fn lock(handle: &Mutex<UserAccount>) -> MutexGuard<'_, UserAccount> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
