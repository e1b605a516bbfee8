//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They provide semantic meaning and enable future type evolution.

/// User ID - globally unique, immutable after assignment.
///
/// # Usage:
/// - Primary key for user accounts
/// - Opaque: never derived from the display name
pub type UserId = u64;

/// Signed balance amount. Negative values are debt.
pub type Amount = i64;

/// Payout multiplier applied to a stake on a win.
pub type Odds = u32;

/// Sequence number for ordering journal entries
pub type SeqNum = u64;
