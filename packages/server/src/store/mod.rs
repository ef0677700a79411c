//! Database access, one module per aggregate.
//!
//! Functions are generic over [`sea_orm::ConnectionTrait`] so callers can run
//! them on the pool or inside an open transaction.

pub mod anti_cheat;
pub mod matches;
pub mod problems;
pub mod profiles;
pub mod submissions;

pub use profiles::{BattleOutcome, RatingLedger};
