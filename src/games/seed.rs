use crate::common::traits::SeedSource;
use crate::games::types::{Seed, SEED_LEN};
use rand_core::{OsRng, RngCore};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Seeds from the operating system's CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn generate(&self) -> Seed {
        let mut bytes = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut bytes);
        Seed::from_bytes(bytes)
    }
}

/// Replays a fixed list of seeds in order, cycling when exhausted.
///
/// Not random: meant for tests and for replaying recorded rounds.
#[derive(Debug)]
pub struct SequenceSeedSource {
    seeds: Vec<Seed>,
    cursor: AtomicUsize,
}

impl SequenceSeedSource {
    /// Panics if `seeds` is empty
    pub fn new(seeds: Vec<Seed>) -> Self {
        assert!(!seeds.is_empty(), "SequenceSeedSource needs at least one seed");
        Self {
            seeds,
            cursor: AtomicUsize::new(0),
        }
    }

    /// A source that returns the same seed forever
    pub fn constant(seed: Seed) -> Self {
        Self::new(vec![seed])
    }
}

impl SeedSource for SequenceSeedSource {
    fn generate(&self) -> Seed {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.seeds.len();
        self.seeds[index].clone()
    }
}
