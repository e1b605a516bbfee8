//! Wager kinds
//!
//! A game only decides the outcome and the odds. It never touches a
//! balance; the engine escrows before and settles after.

use rand::{Rng, RngCore};

use crate::core_types::Odds;
use crate::error::LedgerError;
use crate::wager::state::Outcome;

/// Result of evaluating a guess
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    /// What was drawn, for the reply message
    pub drawn: String,
}

pub trait Game: Send + Sync {
    fn name(&self) -> &'static str;

    /// Payout multiplier on a win
    fn odds(&self) -> Odds;

    /// Parse `input` and draw from `rng`.
    ///
    /// # Errors
    /// `InvalidGuess` when the input cannot be evaluated.
    fn evaluate(&self, input: &str, rng: &mut dyn RngCore) -> Result<Verdict, LedgerError>;
}

/// Guess the face of a six-sided die.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiceGuess;

impl Game for DiceGuess {
    fn name(&self) -> &'static str {
        "dice"
    }

    fn odds(&self) -> Odds {
        6
    }

    fn evaluate(&self, input: &str, rng: &mut dyn RngCore) -> Result<Verdict, LedgerError> {
        let guess: u32 = input
            .trim()
            .parse()
            .map_err(|_| LedgerError::InvalidGuess(input.to_string()))?;
        if !(1..=6).contains(&guess) {
            return Err(LedgerError::InvalidGuess(input.to_string()));
        }

        let roll: u32 = rng.gen_range(1..=6);
        let outcome = if roll == guess {
            Outcome::Win
        } else {
            Outcome::Lose
        };
        Ok(Verdict {
            outcome,
            drawn: roll.to_string(),
        })
    }
}

/// Call heads or tails.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlip;

impl Game for CoinFlip {
    fn name(&self) -> &'static str {
        "coin"
    }

    fn odds(&self) -> Odds {
        2
    }

    fn evaluate(&self, input: &str, rng: &mut dyn RngCore) -> Result<Verdict, LedgerError> {
        let call = match input.trim().to_ascii_lowercase().as_str() {
            "heads" | "h" => "heads",
            "tails" | "t" => "tails",
            _ => return Err(LedgerError::InvalidGuess(input.to_string())),
        };

        let drawn = if rng.gen_bool(0.5) { "heads" } else { "tails" };
        let outcome = if drawn == call {
            Outcome::Win
        } else {
            Outcome::Lose
        };
        Ok(Verdict {
            outcome,
            drawn: drawn.to_string(),
        })
    }
}

static DICE: DiceGuess = DiceGuess;
static COIN: CoinFlip = CoinFlip;

/// Look a game up by the name a user typed.
pub fn lookup(name: &str) -> Option<&'static dyn Game> {
    match name.trim().to_ascii_lowercase().as_str() {
        "dice" => Some(&DICE),
        "coin" => Some(&COIN),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_dice_outcome_matches_roll() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut wins = 0;
        for _ in 0..600 {
            let v = DiceGuess.evaluate("3", &mut rng).unwrap();
            let roll: u32 = v.drawn.parse().unwrap();
            assert!((1..=6).contains(&roll));
            assert_eq!(v.outcome == Outcome::Win, roll == 3);
            if v.outcome == Outcome::Win {
                wins += 1;
            }
        }
        assert!(wins > 0 && wins < 600);
    }

    #[test]
    fn test_dice_rejects_bad_guess() {
        let mut rng = StdRng::seed_from_u64(1);
        for bad in ["0", "7", "-1", "three", ""] {
            assert_eq!(
                DiceGuess.evaluate(bad, &mut rng),
                Err(LedgerError::InvalidGuess(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_coin() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let v = CoinFlip.evaluate("Heads", &mut rng).unwrap();
            assert_eq!(v.outcome == Outcome::Win, v.drawn == "heads");
        }
        assert!(CoinFlip.evaluate("edge", &mut rng).is_err());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("dice").map(|g| g.odds()), Some(6));
        assert_eq!(lookup(" COIN ").map(|g| g.name()), Some("coin"));
        assert!(lookup("roulette").is_none());
    }
}
