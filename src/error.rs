//! Ledger Error Types
//!
//! Every variant is recoverable and local to a single operation.
//! The caller converts them into user-facing messages.

use thiserror::Error;

use crate::core_types::{Amount, UserId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Account Errors ===
    #[error("Unknown account: {0}")]
    UnknownAccount(UserId),

    // === Validation Errors ===
    #[error("Amount must be greater than zero, got {0}")]
    InvalidAmount(Amount),

    #[error("Odds must be greater than zero")]
    InvalidOdds,

    #[error("Invalid guess: {0}")]
    InvalidGuess(String),

    #[error("Unknown game: {0}")]
    UnknownGame(String),

    #[error("Amount would cause overflow")]
    Overflow,

    // === Bet Lifecycle Errors ===
    #[error("No pending bet for account {0}")]
    NoPendingBet(UserId),

    #[error("A bet is already pending for account {0}")]
    BetAlreadyPending(UserId),

    #[error("Odds were not set for the pending bet of account {0}")]
    OddsNotSet(UserId),
}

impl LedgerError {
    /// Stable error code for the transport layer
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InvalidOdds => "INVALID_ODDS",
            LedgerError::InvalidGuess(_) => "INVALID_GUESS",
            LedgerError::UnknownGame(_) => "UNKNOWN_GAME",
            LedgerError::Overflow => "OVERFLOW",
            LedgerError::NoPendingBet(_) => "NO_PENDING_BET",
            LedgerError::BetAlreadyPending(_) => "BET_ALREADY_PENDING",
            LedgerError::OddsNotSet(_) => "ODDS_NOT_SET",
        }
    }

    /// True when a stake may already be escrowed and the caller owes a refund.
    /// A failed settlement (missing odds, payout overflow) leaves the bet
    /// escrowed, so those count too.
    pub fn requires_refund(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidGuess(_)
                | LedgerError::OddsNotSet(_)
                | LedgerError::InvalidOdds
                | LedgerError::Overflow
        )
    }
}
