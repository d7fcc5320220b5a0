use crate::errors::{RoundError, SeedError};
use crate::games::payout::DifficultyTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Numbers are drawn from the closed range [1, NUMBER_RANGE]
pub const NUMBER_RANGE: u8 = 80;

/// Upper bound on the player's selection
pub const MAX_SELECTION: usize = 10;

/// Most numbers a single round may reveal
pub const MAX_DRAW_SIZE: usize = 20;

/// Numbers revealed per round
pub const DEFAULT_DRAW_SIZE: usize = MAX_DRAW_SIZE;

/// Seed length in bytes (256 bits)
pub const SEED_LEN: usize = 32;

/// High-entropy seed material for one party of a round.
///
/// Rendered and parsed as lowercase hex. `Debug` never prints the bytes so
/// an unrevealed house seed can't leak through logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a seed from its hex rendering (case-insensitive)
    pub fn from_hex(hex_str: &str) -> Result<Self, SeedError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|e| SeedError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let array: [u8; SEED_LEN] = bytes.try_into().map_err(|_| SeedError::InvalidLength {
            expected: SEED_LEN,
            actual,
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// SHA-256 of the raw seed bytes, hex-encoded. Published ahead of play in
    /// precommitted mode.
    pub fn commitment_hash(&self) -> String {
        hex::encode(Sha256::digest(self.0))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Seed> for String {
    fn from(seed: Seed) -> Self {
        seed.to_hex()
    }
}

impl TryFrom<String> for Seed {
    type Error = SeedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Seed::from_hex(&value)
    }
}

/// The player's chosen numbers: distinct, within range, at most ten
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Selection {
    numbers: BTreeSet<u8>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from a list of numbers. Duplicates collapse; more
    /// than ten distinct numbers or any out-of-range number is rejected.
    pub fn from_numbers<I>(numbers: I) -> Result<Self, RoundError>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut set = BTreeSet::new();
        for number in numbers {
            ensure_in_range(number)?;
            set.insert(number);
        }

        if set.len() > MAX_SELECTION {
            return Err(RoundError::invalid_selection(format!(
                "at most {} numbers may be selected, got {}",
                MAX_SELECTION,
                set.len()
            )));
        }

        Ok(Self { numbers: set })
    }

    /// Add a number. Returns `Ok(false)` without changing anything when the
    /// number is already present or the selection is full.
    pub fn insert(&mut self, number: u8) -> Result<bool, RoundError> {
        ensure_in_range(number)?;
        if self.numbers.contains(&number) || self.is_full() {
            return Ok(false);
        }
        Ok(self.numbers.insert(number))
    }

    /// Deselect a chosen number or select an unchosen one. Returns whether the
    /// selection changed; selecting an 11th number is a silent no-op.
    pub fn toggle(&mut self, number: u8) -> Result<bool, RoundError> {
        ensure_in_range(number)?;
        if self.numbers.remove(&number) {
            return Ok(true);
        }
        self.insert(number)
    }

    pub fn clear(&mut self) {
        self.numbers.clear();
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.numbers.len() >= MAX_SELECTION
    }

    /// Selected numbers in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.numbers.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.iter().collect()
    }

    /// Selected numbers present in the draw, in reveal order
    pub fn matches(&self, draw: &Draw) -> Vec<u8> {
        draw.numbers()
            .iter()
            .copied()
            .filter(|n| self.contains(*n))
            .collect()
    }

    /// Cardinality of the intersection with the draw
    pub fn match_count(&self, draw: &Draw) -> usize {
        self.matches(draw).len()
    }
}

impl TryFrom<Vec<u8>> for Selection {
    type Error = RoundError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Selection::from_numbers(value)
    }
}

impl From<Selection> for Vec<u8> {
    fn from(selection: Selection) -> Self {
        selection.to_vec()
    }
}

fn ensure_in_range(number: u8) -> Result<(), RoundError> {
    if (1..=NUMBER_RANGE).contains(&number) {
        Ok(())
    } else {
        Err(RoundError::invalid_selection(format!(
            "{} is outside 1..={}",
            number, NUMBER_RANGE
        )))
    }
}

/// Ordered, duplicate-free numbers extracted from a commitment digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    numbers: Vec<u8>,
    requested: usize,
}

impl Draw {
    pub(crate) fn new(numbers: Vec<u8>, requested: usize) -> Self {
        Self { numbers, requested }
    }

    /// Numbers in reveal order
    pub fn numbers(&self) -> &[u8] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// False when the digest ran out before `requested` numbers were found
    pub fn is_complete(&self) -> bool {
        self.numbers.len() >= self.requested
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers.contains(&number)
    }
}

/// Round lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Idle,
    Committed,
    Revealing,
    Settled,
}

impl RoundState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundState::Idle => "idle",
            RoundState::Committed => "committed",
            RoundState::Revealing => "revealing",
            RoundState::Settled => "settled",
        }
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the house seed relates to the player's commitment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentMode {
    /// Both seeds are generated immediately before the round is committed
    #[default]
    FreshPerRound,
    /// The house seed is fixed at the previous rotation and its SHA-256 hash
    /// is published before the player plays
    Precommitted,
}

/// Stake presets offered next to the stake input
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StakeAdjustment {
    Half,
    Double,
    Max,
}

/// Outcome of a settled round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub match_count: usize,
    pub multiplier: u64,
    pub payout: u64,
    pub new_balance: u64,
    /// Selected numbers that were drawn, in reveal order
    pub matched: Vec<u8>,
    /// False when the digest was exhausted before the full draw size
    pub draw_complete: bool,
}

impl Settlement {
    pub(crate) fn no_round(balance: u64) -> Self {
        Self {
            match_count: 0,
            multiplier: 0,
            payout: 0,
            new_balance: balance,
            matched: Vec::new(),
            draw_complete: true,
        }
    }
}

/// Events streamed to the caller while a round plays out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    NumberRevealed {
        index: usize,
        number: u8,
        is_match: bool,
    },
    Settled(Settlement),
}

/// Everything a third party needs to recompute a settled round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub house_seed: String,
    pub player_seed: String,
    pub digest_hex: String,
    /// SHA-256 of the house seed; equals the published commitment in
    /// precommitted mode
    pub house_seed_hash: String,
}

/// Complete record of one settled round, for persistence by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round_id: Uuid,
    pub settled_at: DateTime<Utc>,
    pub commitment_mode: CommitmentMode,
    pub tier: DifficultyTier,
    pub stake: u64,
    pub selection: Selection,
    pub draw_size: usize,
    pub draw: Vec<u8>,
    pub audit: AuditInfo,
    pub settlement: Settlement,
}
