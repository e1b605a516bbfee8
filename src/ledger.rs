//! Ledger - Balance audit journal
//!
//! Records every balance change for complete auditability.
//! Entries are queued lock-free while the account guard is held and
//! drained to disk later, outside every guard.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::SegQueue;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::account_store::AccountSnapshot;
use crate::core_types::{Amount, SeqNum, UserId};
use crate::wager::state::Outcome;

/// Kind of balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LedgerOp {
    /// Account created with its starting balance
    Open,
    Deposit,
    Spend,
    SetBalance,
    /// Stake withdrawn at bet placement
    Escrow,
    /// Winning bet credited
    Payout,
    /// Escrowed stake returned
    Refund,
    /// Losing bet settled (no balance effect, never journaled)
    Forfeit,
    /// Balance loaded from a snapshot
    Restore,
}

impl LedgerOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOp::Open => "open",
            LedgerOp::Deposit => "deposit",
            LedgerOp::Spend => "spend",
            LedgerOp::SetBalance => "set_balance",
            LedgerOp::Escrow => "escrow",
            LedgerOp::Payout => "payout",
            LedgerOp::Refund => "refund",
            LedgerOp::Forfeit => "forfeit",
            LedgerOp::Restore => "restore",
        }
    }
}

impl From<Outcome> for LedgerOp {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Win => LedgerOp::Payout,
            Outcome::Lose => LedgerOp::Forfeit,
            Outcome::Invalid => LedgerOp::Refund,
        }
    }
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry for balance audit.
/// Each balance change is recorded as one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub seq: SeqNum,
    pub user_id: UserId,
    pub op: LedgerOp,
    /// Exact change; a jump between the extremes of `Amount` still fits
    pub delta: i128,
    pub balance_after: Amount,
    /// Balance version after the change
    pub version: u64,
}

// ============================================================
// AUDIT LOG
// ============================================================

/// Lock-free, unbounded queue of ledger entries.
#[derive(Debug, Default)]
pub struct AuditLog {
    queue: SegQueue<LedgerEntry>,
    next_seq: AtomicU64,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        user_id: UserId,
        op: LedgerOp,
        delta: i128,
        balance_after: Amount,
        version: u64,
    ) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.queue.push(LedgerEntry {
            seq,
            user_id,
            op,
            delta,
            balance_after,
            version,
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Remove every queued entry, in seq order.
    pub fn drain(&self) -> Vec<LedgerEntry> {
        let mut entries = Vec::with_capacity(self.queue.len());
        while let Some(entry) = self.queue.pop() {
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.seq);
        entries
    }

    /// Drain queued entries into a writer. Returns the number written.
    pub fn drain_to<W: Write>(&self, writer: &mut LedgerWriter<W>) -> io::Result<usize> {
        let entries = self.drain();
        for entry in &entries {
            writer.write_entry(entry)?;
        }
        writer.flush()?;
        Ok(entries.len())
    }
}

/// Net balance change per user. Includes the opening balance when the
/// `Open` entry is present, so the sum equals the current balance.
pub fn net_deltas(entries: &[LedgerEntry]) -> FxHashMap<UserId, i128> {
    let mut net: FxHashMap<UserId, i128> = FxHashMap::default();
    for entry in entries {
        *net.entry(entry.user_id).or_default() += entry.delta;
    }
    net
}

// ============================================================
// CSV WRITERS
// ============================================================

/// Writes ledger entries as CSV
pub struct LedgerWriter<W: Write> {
    out: W,
    entry_count: u64,
}

impl LedgerWriter<BufWriter<File>> {
    /// Create a new ledger file at the given path
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "seq,user_id,op,delta,balance_after,version")?;
        Ok(Self {
            out,
            entry_count: 0,
        })
    }

    pub fn write_entry(&mut self, entry: &LedgerEntry) -> io::Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{}",
            entry.seq, entry.user_id, entry.op, entry.delta, entry.balance_after, entry.version
        )?;
        self.entry_count += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Get total number of entries written
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Dump final balances as CSV, sorted by user id.
pub fn dump_balances<W: Write>(accounts: &[AccountSnapshot], mut out: W) -> io::Result<()> {
    writeln!(out, "user_id,display_name,balance,version,pending_stake")?;
    for account in accounts {
        writeln!(
            out,
            "{},{},{},{},{}",
            account.user_id,
            account.display_name,
            account.balance,
            account.version,
            account.pending_bet.map(|b| b.amount).unwrap_or(0)
        )?;
    }
    out.flush()
}
