//! WalletService - the operation surface handed to the command layer
//!
//! Owns the store and engine as explicit instances; nothing here is global,
//! so every test can build an isolated service.

use std::sync::Arc;

use rand::RngCore;
use tracing::{info, warn};

use crate::account_store::{AccountSnapshot, AccountStore};
use crate::config::WalletConfig;
use crate::core_types::{Amount, Odds, UserId};
use crate::error::LedgerError;
use crate::ledger::{AuditLog, LedgerOp};
use crate::snapshot::LedgerSnapshot;
use crate::wager::games;
use crate::wager::{Outcome, PendingBet, PlayReport, Settlement, WagerEngine};

pub struct WalletService {
    store: Arc<AccountStore>,
    engine: WagerEngine,
    config: WalletConfig,
}

impl WalletService {
    pub fn new(config: WalletConfig) -> Self {
        let store = if config.audit_enabled {
            AccountStore::with_audit(Arc::new(AuditLog::new()))
        } else {
            AccountStore::new()
        };
        Self::with_store(Arc::new(store), config)
    }

    pub fn with_store(store: Arc<AccountStore>, config: WalletConfig) -> Self {
        Self {
            engine: WagerEngine::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub fn engine(&self) -> &WagerEngine {
        &self.engine
    }

    pub fn audit(&self) -> Option<&Arc<AuditLog>> {
        self.store.audit()
    }

    // ============================================================
    // ACCOUNTS
    // ============================================================

    /// Create the account on first sight; return the current balance.
    pub fn ensure_account(&self, user_id: UserId, display_name: &str) -> Amount {
        self.store
            .get_or_create(user_id, display_name, self.config.starting_balance)
            .balance
    }

    /// Ensure an account for every member. Returns how many were new.
    pub fn ensure_members<'a>(
        &self,
        members: impl IntoIterator<Item = (UserId, &'a str)>,
    ) -> usize {
        let mut created = 0;
        for (user_id, name) in members {
            let (account, new) = self
                .store
                .open(user_id, name, self.config.starting_balance);
            if new {
                created += 1;
            }
            info!(user_id, name, balance = account.balance, new, "Account ready");
        }
        created
    }

    pub fn get_balance(&self, user_id: UserId) -> Result<Amount, LedgerError> {
        self.store.snapshot(user_id)
    }

    pub fn account(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerError> {
        self.store.account(user_id)
    }

    // ============================================================
    // WAGERS
    // ============================================================

    pub fn place_bet(&self, user_id: UserId, amount: Amount) -> Result<PendingBet, LedgerError> {
        self.engine.place_bet(user_id, amount)
    }

    pub fn set_odds(&self, user_id: UserId, odds: Odds) -> Result<PendingBet, LedgerError> {
        self.engine.set_odds(user_id, odds)
    }

    /// Settle the pending bet; returns the new balance.
    pub fn resolve(&self, user_id: UserId, outcome: Outcome) -> Result<Amount, LedgerError> {
        self.engine
            .resolve(user_id, outcome)
            .map(|s: Settlement| s.balance_after)
    }

    /// Play a game by the name the user typed.
    ///
    /// An unknown game is rejected before anything is escrowed.
    pub fn play(
        &self,
        user_id: UserId,
        amount: Amount,
        game_name: &str,
        input: &str,
        rng: &mut dyn RngCore,
    ) -> Result<PlayReport, LedgerError> {
        let game = games::lookup(game_name)
            .ok_or_else(|| LedgerError::UnknownGame(game_name.to_string()))?;
        self.engine.play(user_id, amount, game, input, rng)
    }

    // ============================================================
    // ADMINISTRATION
    // ============================================================

    pub fn admin_deposit(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        info!(user_id, amount, "Admin deposit");
        self.store.deposit(user_id, amount)
    }

    pub fn admin_spend(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        info!(user_id, amount, "Admin spend");
        self.store.spend(user_id, amount)
    }

    pub fn admin_set_balance(&self, user_id: UserId, amount: Amount) -> Result<Amount, LedgerError> {
        info!(user_id, amount, "Admin set balance");
        self.store.set_balance(user_id, amount)
    }

    /// Reset the balance to the configured reset value, whatever its sign.
    pub fn wipe_debt(&self, user_id: UserId) -> Result<Amount, LedgerError> {
        let reset = self.config.debt_reset_balance;
        let (before, after) = self
            .store
            .update(user_id, LedgerOp::SetBalance, |account| {
                let before = account.balance().amount();
                account.set_balance(reset)?;
                Ok((before, account.balance().amount()))
            })?;
        if before >= 0 {
            warn!(user_id, before, after, "Debt wiped on an account without debt");
        } else {
            info!(user_id, before, after, "Debt wiped");
        }
        Ok(after)
    }

    // ============================================================
    // PERSISTENCE
    // ============================================================

    /// Capture the persistable view of every account.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(&self.store)
    }

    pub fn restore(&self, saved: &LedgerSnapshot) -> Result<usize, LedgerError> {
        saved.restore_into(&self.store)
    }
}
