//! Shared traits and interfaces
//!
//! The round engine depends on its entropy and its reveal pacing only through
//! these traits, so tests can inject fixed seeds and a zero-delay clock.

use crate::games::types::Seed;
use async_trait::async_trait;
use std::time::Duration;

/// Source of fresh seed material for the house and the player
pub trait SeedSource: Send + Sync {
    /// Return a freshly sampled seed. Production implementations must draw
    /// from a cryptographically secure generator.
    fn generate(&self) -> Seed;
}

/// "Delay then resume" capability used to pace the reveal
#[async_trait]
pub trait RevealScheduler: Send + Sync {
    /// Suspend the caller for `duration`
    async fn delay(&self, duration: Duration);
}
