//! Keno - provably fair number-draw engine
//!
//! A player picks up to ten numbers from 1..=80. The house and player seeds
//! are combined with HMAC-SHA256 into a commitment digest, twenty distinct
//! numbers are read out of the digest, and the stake is paid according to
//! the match count and the chosen difficulty tier. After settlement both
//! seeds are revealed so anyone can recompute the round.

pub mod common;
pub mod errors;
pub mod games;

pub use common::config::{ConfigBuilder, ConfigLoader, KenoConfig};
pub use common::traits::{RevealScheduler, SeedSource};
pub use errors::{KenoError, KenoResult, RoundError};
pub use games::{
    DifficultyTier, Round, RoundEngine, RoundEvent, RoundRecord, RoundState, Seed, Selection,
    Settlement,
};
