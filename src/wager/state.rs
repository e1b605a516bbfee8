//! Bet Lifecycle State Definitions
//!
//! ```text
//! NO_BET --place--> ESCROWED --resolve(WIN | LOSE | INVALID)--> SETTLED
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core_types::{Amount, Odds, UserId};

/// Terminal result of a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Stake times odds is credited
    Win,
    /// Nothing is credited; the stake was forfeited at placement
    Lose,
    /// The wager could not be evaluated; the stake is refunded
    Invalid,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Lose => "LOSE",
            Outcome::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WIN" => Ok(Outcome::Win),
            "LOSE" => Ok(Outcome::Lose),
            "INVALID" => Ok(Outcome::Invalid),
            _ => Err(()),
        }
    }
}

/// Per-bet FSM state.
///
/// An account only ever holds `NoBet` or `Escrowed`; `Settled` is carried by
/// the [`Settlement`] record produced on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BetState {
    NoBet,
    /// Stake withdrawn, outcome unknown. CRITICAL: must reach SETTLED
    Escrowed,
    Settled,
}

impl BetState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, BetState::Settled)
    }

    /// Funds have left the balance but have not been settled
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, BetState::Escrowed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BetState::NoBet => "NO_BET",
            BetState::Escrowed => "ESCROWED",
            BetState::Settled => "SETTLED",
        }
    }
}

impl fmt::Display for BetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Escrowed stake and payout multiplier. Odds of zero means not yet attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBet {
    pub amount: u64,
    pub odds: Odds,
}

impl PendingBet {
    pub fn new(amount: u64) -> Self {
        Self { amount, odds: 0 }
    }

    /// Stake as a balance delta; None if it does not fit.
    pub fn stake(&self) -> Option<Amount> {
        Amount::try_from(self.amount).ok()
    }

    /// Gross credit on a win; None on overflow.
    pub fn payout(&self) -> Option<Amount> {
        self.stake()?.checked_mul(Amount::from(self.odds))
    }
}

/// Record of a resolved bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub user_id: UserId,
    pub bet: PendingBet,
    pub outcome: Outcome,
    pub credited: Amount,
    pub balance_after: Amount,
}

impl Settlement {
    /// Net effect of the whole bet versus the pre-bet balance.
    pub fn net(&self) -> Amount {
        self.credited.saturating_sub(self.bet.stake().unwrap_or(Amount::MAX))
    }

    pub fn state(&self) -> BetState {
        BetState::Settled
    }
}
