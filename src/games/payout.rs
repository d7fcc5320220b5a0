//! Difficulty tiers and their match-count multiplier tables

use crate::errors::RoundError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const EASY_MULTIPLIERS: [u64; 10] = [0, 3, 4, 8, 10, 15, 30, 40, 100, 200];
const MEDIUM_MULTIPLIERS: [u64; 10] = [0, 4, 6, 10, 15, 25, 45, 80, 150, 300];
const HARD_MULTIPLIERS: [u64; 10] = [0, 5, 8, 15, 25, 40, 60, 120, 200, 400];

/// Named payout configuration selectable before a round
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    pub fn all() -> [DifficultyTier; 3] {
        [DifficultyTier::Easy, DifficultyTier::Medium, DifficultyTier::Hard]
    }

    /// Stable identifier used in configs and records
    pub fn id(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
        }
    }

    /// Display name for the payout table
    pub fn name(&self) -> &'static str {
        match self {
            DifficultyTier::Easy => "Easy",
            DifficultyTier::Medium => "Medium",
            DifficultyTier::Hard => "Hard",
        }
    }

    /// Multipliers indexed by match count
    pub fn multipliers(&self) -> &'static [u64] {
        match self {
            DifficultyTier::Easy => &EASY_MULTIPLIERS,
            DifficultyTier::Medium => &MEDIUM_MULTIPLIERS,
            DifficultyTier::Hard => &HARD_MULTIPLIERS,
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DifficultyTier {
    type Err = RoundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "medium" => Ok(DifficultyTier::Medium),
            "hard" => Ok(DifficultyTier::Hard),
            _ => Err(RoundError::UnknownTier(s.to_string())),
        }
    }
}

/// Pure multiplier lookup and payout arithmetic
pub struct PayoutTable;

impl PayoutTable {
    /// Multiplier for `match_count` matches. Counts past the end of the table
    /// (ten matches) pay the last entry.
    pub fn multiplier(tier: DifficultyTier, match_count: usize) -> u64 {
        let table = tier.multipliers();
        let index = match_count.min(table.len() - 1);
        table[index]
    }

    pub fn payout(stake: u64, multiplier: u64) -> u64 {
        stake.saturating_mul(multiplier)
    }
}
