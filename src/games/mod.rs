pub mod types;
pub mod seed;
pub mod commitment;
pub mod draw;
pub mod payout;
pub mod scheduler;
pub mod engine;
pub mod verify;

pub use types::*;
pub use commitment::{commit, commit_extended, CommitmentDigest};
pub use draw::DrawExtractor;
pub use engine::{Round, RoundEngine};
pub use payout::{DifficultyTier, PayoutTable};
pub use scheduler::{InstantScheduler, TokioScheduler};
pub use seed::{OsSeedSource, SequenceSeedSource};
pub use verify::{replay, verify_record, Replay, RoundVerification};
