//! Wager Ledger - community wallet and bet settlement
//!
//! An in-memory ledger of per-user balances with an escrow-then-resolve
//! wager engine, safe under concurrent access.
//!
//! # Modules
//!
//! - [`core_types`] - Core type definitions (UserId, Amount, Odds)
//! - [`balance`] - Enforced balance type
//! - [`user_account`] - Per-user wallet record
//! - [`account_store`] - Concurrent account store (per-account locking)
//! - [`wager`] - Bet lifecycle FSM, engine and games
//! - [`wallet`] - Operation surface for the command layer
//! - [`ledger`] - Balance audit journal
//! - [`snapshot`] - Save/restore of the account set
//! - [`config`] / [`logging`] - Ambient configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod account_store;
pub mod balance;
pub mod error;
pub mod ledger;
pub mod snapshot;
pub mod user_account;
pub mod wager;
pub mod wallet;

pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use account_store::{AccountSnapshot, AccountStore};
pub use balance::Balance;
pub use core_types::{Amount, Odds, SeqNum, UserId};
pub use error::LedgerError;
pub use ledger::{AuditLog, LedgerEntry, LedgerOp, LedgerWriter};
pub use user_account::UserAccount;
pub use wager::{BetState, Outcome, PendingBet, PlayReport, Settlement, WagerEngine};
pub use wallet::WalletService;
