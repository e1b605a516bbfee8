//! Wager lifecycle
//!
//! Escrow-then-resolve betting on top of the account store.
//!
//! # State Machine
//!
//! ```text
//! NO_BET → ESCROWED → SETTLED
//!             │
//!             ├─ WIN:     credit stake × odds
//!             ├─ LOSE:    no credit (stake already spent)
//!             └─ INVALID: refund stake
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Escrow First**: the stake leaves the balance at placement
//! 2. **One Pending Bet**: a second placement is rejected, never overwritten
//! 3. **No Leaked Escrow**: any failure after escrow, including a payout
//!    that cannot be credited, resolves as INVALID
//! 4. **Single Delta**: each transition applies at most one balance change

pub mod engine;
pub mod games;
pub mod state;


pub use engine::{PlayReport, WagerEngine};
pub use games::{CoinFlip, DiceGuess, Game, Verdict};
pub use state::{BetState, Outcome, PendingBet, Settlement};
