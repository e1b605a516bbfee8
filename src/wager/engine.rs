//! Wager Engine
//!
//! Drives the bet FSM on top of [`AccountStore`]. The engine holds no locks
//! and no state of its own: every bet lives on its account, and every
//! balance effect is one atomic store operation.

use std::sync::Arc;

use rand::RngCore;
use tracing::{debug, info, warn};

use crate::account_store::AccountStore;
use crate::core_types::{Amount, Odds, UserId};
use crate::error::LedgerError;
use crate::ledger::LedgerOp;
use crate::wager::games::Game;
use crate::wager::state::{BetState, Outcome, PendingBet, Settlement};

/// Result of a complete place → evaluate → settle round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayReport {
    pub game: &'static str,
    pub settlement: Settlement,
    /// What the game drew; None when the guess could not be evaluated
    pub drawn: Option<String>,
    /// Why the bet was refunded, if it was
    pub refund_reason: Option<LedgerError>,
}

#[derive(Clone)]
pub struct WagerEngine {
    store: Arc<AccountStore>,
}

impl WagerEngine {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// Escrow `amount` from the user's balance.
    ///
    /// # Errors
    /// - `UnknownAccount` if the user was never seen
    /// - `InvalidAmount` if `amount <= 0`
    /// - `BetAlreadyPending` if an earlier bet is still escrowed
    pub fn place_bet(&self, user_id: UserId, amount: Amount) -> Result<PendingBet, LedgerError> {
        let bet = self
            .store
            .update(user_id, LedgerOp::Escrow, |account| account.escrow(amount))?;
        debug!(user_id, amount, "Bet escrowed");
        Ok(bet)
    }

    /// Attach the payout multiplier for the escrowed bet.
    pub fn set_odds(&self, user_id: UserId, odds: Odds) -> Result<PendingBet, LedgerError> {
        self.store
            .modify(user_id, |account| account.attach_odds(odds))
    }

    /// Apply the terminal outcome and clear the pending bet.
    ///
    /// # Errors
    /// - `NoPendingBet` if nothing is escrowed
    /// - `OddsNotSet` on a win with no odds attached; the bet stays escrowed
    pub fn resolve(&self, user_id: UserId, outcome: Outcome) -> Result<Settlement, LedgerError> {
        let settlement = self
            .store
            .update(user_id, LedgerOp::from(outcome), |account| {
                let (bet, credited) = account.settle(outcome)?;
                Ok(Settlement {
                    user_id,
                    bet,
                    outcome,
                    credited,
                    balance_after: account.balance().amount(),
                })
            })?;

        info!(
            user_id,
            stake = settlement.bet.amount,
            odds = settlement.bet.odds,
            outcome = %outcome,
            credited = settlement.credited,
            balance = settlement.balance_after,
            "Bet settled"
        );
        Ok(settlement)
    }

    pub fn pending_bet(&self, user_id: UserId) -> Result<Option<PendingBet>, LedgerError> {
        Ok(self.store.account(user_id)?.pending_bet)
    }

    pub fn bet_state(&self, user_id: UserId) -> Result<BetState, LedgerError> {
        Ok(match self.pending_bet(user_id)? {
            Some(_) => BetState::Escrowed,
            None => BetState::NoBet,
        })
    }

    /// Run one full round of `game`.
    ///
    /// Once the stake is escrowed, a failure to evaluate or to settle
    /// resolves the bet as `Invalid`, so the stake is always either settled
    /// or refunded.
    pub fn play(
        &self,
        user_id: UserId,
        amount: Amount,
        game: &dyn Game,
        input: &str,
        rng: &mut dyn RngCore,
    ) -> Result<PlayReport, LedgerError> {
        self.place_bet(user_id, amount)?;

        let verdict = self
            .set_odds(user_id, game.odds())
            .and_then(|_| game.evaluate(input, rng));

        let (reason, drawn) = match verdict {
            Ok(verdict) => match self.resolve(user_id, verdict.outcome) {
                Ok(settlement) => {
                    return Ok(PlayReport {
                        game: game.name(),
                        settlement,
                        drawn: Some(verdict.drawn),
                        refund_reason: None,
                    });
                }
                // Settlement failed but left the bet escrowed
                Err(reason) if reason.requires_refund() => (reason, Some(verdict.drawn)),
                Err(e) => return Err(e),
            },
            Err(reason) => (reason, None),
        };

        warn!(
            user_id,
            game = game.name(),
            input,
            error = %reason,
            "Wager could not be settled, refunding stake"
        );
        let settlement = self.resolve(user_id, Outcome::Invalid)?;
        Ok(PlayReport {
            game: game.name(),
            settlement,
            drawn,
            refund_reason: Some(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wager::games::{DiceGuess, Game, Verdict};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Always wins at odds 6
    struct LoadedDie;

    impl Game for LoadedDie {
        fn name(&self) -> &'static str {
            "loaded"
        }

        fn odds(&self) -> Odds {
            6
        }

        fn evaluate(&self, input: &str, _rng: &mut dyn RngCore) -> Result<Verdict, LedgerError> {
            Ok(Verdict {
                outcome: Outcome::Win,
                drawn: input.to_string(),
            })
        }
    }

    fn engine() -> WagerEngine {
        let store = Arc::new(AccountStore::new());
        store.get_or_create(1, "alice", 100);
        WagerEngine::new(store)
    }

    #[test]
    fn test_win_payout() {
        let engine = engine();
        engine.place_bet(1, 10).unwrap();
        engine.set_odds(1, 6).unwrap();
        let s = engine.resolve(1, Outcome::Win).unwrap();

        assert_eq!(s.credited, 60);
        assert_eq!(s.balance_after, 150);
        assert_eq!(s.net(), 50);
    }

    #[test]
    fn test_lose() {
        let engine = engine();
        engine.place_bet(1, 10).unwrap();
        let s = engine.resolve(1, Outcome::Lose).unwrap();
        assert_eq!(s.balance_after, 90);
        assert_eq!(engine.store().snapshot(1).unwrap(), 90);
    }

    #[test]
    fn test_escrow_refund_inverse() {
        let engine = engine();
        for amount in [1, 37, 100, 250] {
            let before = engine.store().snapshot(1).unwrap();
            engine.place_bet(1, amount).unwrap();
            engine.resolve(1, Outcome::Invalid).unwrap();
            assert_eq!(engine.store().snapshot(1).unwrap(), before);
        }
    }

    #[test]
    fn test_invalid_amounts() {
        let engine = engine();
        assert_eq!(engine.place_bet(1, 0), Err(LedgerError::InvalidAmount(0)));
        assert_eq!(engine.place_bet(1, -5), Err(LedgerError::InvalidAmount(-5)));
        assert_eq!(engine.store().snapshot(1).unwrap(), 100);
        assert_eq!(engine.bet_state(1).unwrap(), BetState::NoBet);
    }

    #[test]
    fn test_bet_state_transitions() {
        let engine = engine();
        assert_eq!(engine.bet_state(1).unwrap(), BetState::NoBet);
        engine.place_bet(1, 5).unwrap();
        assert_eq!(engine.bet_state(1).unwrap(), BetState::Escrowed);
        let s = engine.resolve(1, Outcome::Lose).unwrap();
        assert!(s.state().is_terminal());
        assert_eq!(engine.bet_state(1).unwrap(), BetState::NoBet);
    }

    #[test]
    fn test_resolve_without_bet() {
        let engine = engine();
        assert_eq!(
            engine.resolve(1, Outcome::Win),
            Err(LedgerError::NoPendingBet(1))
        );
        assert_eq!(engine.set_odds(1, 6), Err(LedgerError::NoPendingBet(1)));
    }

    #[test]
    fn test_overlapping_bet_rejected() {
        let engine = engine();
        engine.place_bet(1, 10).unwrap();
        assert_eq!(
            engine.place_bet(1, 20),
            Err(LedgerError::BetAlreadyPending(1))
        );
        assert_eq!(engine.store().snapshot(1).unwrap(), 90);
        assert_eq!(engine.pending_bet(1).unwrap().map(|b| b.amount), Some(10));
    }

    #[test]
    fn test_play_refunds_bad_guess() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(11);
        let report = engine.play(1, 25, &DiceGuess, "nine", &mut rng).unwrap();

        assert_eq!(report.settlement.outcome, Outcome::Invalid);
        assert_eq!(report.settlement.balance_after, 100);
        assert_eq!(
            report.refund_reason,
            Some(LedgerError::InvalidGuess("nine".into()))
        );
        assert_eq!(engine.bet_state(1).unwrap(), BetState::NoBet);
    }

    #[test]
    fn test_play_settles() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(5);
        let report = engine.play(1, 10, &DiceGuess, "4", &mut rng).unwrap();

        let expected = match report.settlement.outcome {
            Outcome::Win => 150,
            Outcome::Lose => 90,
            Outcome::Invalid => unreachable!(),
        };
        assert_eq!(report.settlement.balance_after, expected);
        assert!(report.drawn.is_some());
    }

    #[test]
    fn test_play_unknown_account() {
        let engine = engine();
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            engine.play(42, 10, &DiceGuess, "4", &mut rng),
            Err(LedgerError::UnknownAccount(42))
        );
    }

    #[test]
    fn test_play_refunds_when_payout_overflows() {
        let store = Arc::new(AccountStore::new());
        store.get_or_create(1, "whale", i64::MAX - 10);
        let engine = WagerEngine::new(store);
        let mut rng = StdRng::seed_from_u64(2);

        let report = engine.play(1, 10, &LoadedDie, "1", &mut rng).unwrap();

        assert_eq!(report.settlement.outcome, Outcome::Invalid);
        assert_eq!(report.settlement.credited, 10);
        assert_eq!(report.refund_reason, Some(LedgerError::Overflow));
        assert_eq!(report.drawn.as_deref(), Some("1"));
        assert_eq!(engine.store().snapshot(1).unwrap(), i64::MAX - 10);
        assert_eq!(engine.bet_state(1).unwrap(), BetState::NoBet);

        // The account is free for the next bet
        engine.place_bet(1, 1).unwrap();
    }

    #[test]
    fn test_set_odds_rejects_zero() {
        let engine = engine();
        engine.place_bet(1, 10).unwrap();
        assert_eq!(engine.set_odds(1, 0), Err(LedgerError::InvalidOdds));
        assert_eq!(engine.pending_bet(1).unwrap().map(|b| b.odds), Some(0));
    }
}
