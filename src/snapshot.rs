//! Wallet Snapshot Save/Load
//!
//! The persistence boundary for the account set. Only identity, display
//! name and balance are saved. A bet still escrowed at save time has no
//! durable outcome, so it is saved as refunded.
//!
//! Protocol:
//! 1. Serialize to `<path>.tmp`
//! 2. fsync
//! 3. Atomic rename over `<path>`

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account_store::AccountStore;
use crate::core_types::{Amount, UserId};
use crate::error::LedgerError;
use crate::ledger::LedgerOp;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAccount {
    pub display_name: String,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub accounts: BTreeMap<UserId, SavedAccount>,
}

impl LedgerSnapshot {
    /// Capture every account, folding escrowed stakes back into the balance.
    pub fn capture(store: &AccountStore) -> Self {
        let mut accounts = BTreeMap::new();
        for account in store.accounts() {
            let mut balance = account.balance;
            if let Some(bet) = account.pending_bet {
                let stake = bet.stake().unwrap_or(Amount::MAX);
                balance = balance.saturating_add(stake);
                warn!(
                    user_id = account.user_id,
                    stake = bet.amount,
                    "Pending bet saved as refunded"
                );
            }
            accounts.insert(
                account.user_id,
                SavedAccount {
                    display_name: account.display_name,
                    balance,
                },
            );
        }
        Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            accounts,
        }
    }

    /// Load saved accounts into `store`.
    ///
    /// New accounts open at their saved balance. Existing accounts are
    /// renamed and overwritten with the saved balance, and any bet they have
    /// open is dropped since the saved balance already holds its refund.
    /// Returns the number of accounts restored.
    pub fn restore_into(&self, store: &AccountStore) -> Result<usize, LedgerError> {
        for (&user_id, saved) in &self.accounts {
            let (_, created) = store.open(user_id, &saved.display_name, saved.balance);
            if created {
                continue;
            }
            let dropped = store.update(user_id, LedgerOp::Restore, |account| {
                account.rename(saved.display_name.as_str());
                account.set_balance(saved.balance)?;
                Ok(account.abandon_bet())
            })?;
            if let Some(bet) = dropped {
                warn!(user_id, stake = bet.amount, "Open bet replaced by restored balance");
            }
        }
        info!(accounts = self.accounts.len(), "Snapshot restored");
        Ok(self.accounts.len())
    }
}

/// Save the account set atomically.
pub fn save(store: &AccountStore, path: impl AsRef<Path>) -> Result<LedgerSnapshot> {
    let path = path.as_ref();
    let snapshot = LedgerSnapshot::capture(store);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot dir {}", dir.display()))?;
    }

    let tmp = tmp_path(path);
    {
        let file = File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)
            .context("Failed to serialise wallet snapshot")?;
        writer.flush()?;
        writer
            .get_ref()
            .sync_all()
            .context("Failed to sync wallet snapshot")?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;

    debug!(path = %path.display(), accounts = snapshot.accounts.len(), "Snapshot saved");
    Ok(snapshot)
}

/// Load a snapshot. Returns None if the file doesn't exist (fresh start).
pub fn load(path: impl AsRef<Path>) -> Result<Option<LedgerSnapshot>> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "No snapshot found, starting fresh");
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;

    if snapshot.format_version != FORMAT_VERSION {
        bail!(
            "Unsupported snapshot format {} in {}",
            snapshot.format_version,
            path.display()
        );
    }

    info!(
        path = %path.display(),
        accounts = snapshot.accounts.len(),
        created_at = %snapshot.created_at,
        "Snapshot loaded"
    );
    Ok(Some(snapshot))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
