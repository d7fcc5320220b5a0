//! Independent recomputation of settled rounds.
//!
//! Anyone holding the revealed seeds can rerun the commitment, the extraction
//! and the payout lookup and compare against what the engine reported.

use crate::errors::VerificationError;
use crate::games::commitment::{commit_extended, BLOCK_LEN, MAX_DIGEST_BLOCKS};
use crate::games::draw::DrawExtractor;
use crate::games::payout::{DifficultyTier, PayoutTable};
use crate::games::types::{RoundRecord, Seed, Selection};
use serde::{Deserialize, Serialize};

/// Result of rerunning a round from its inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    pub digest_hex: String,
    pub draw: Vec<u8>,
    pub draw_complete: bool,
    pub matched: Vec<u8>,
    pub match_count: usize,
    pub multiplier: u64,
    pub payout: u64,
    pub house_seed_hash: String,
}

/// Rerun a round. Pure: identical inputs always give an identical replay.
pub fn replay(
    house_seed: &Seed,
    player_seed: &Seed,
    selection: &Selection,
    tier: DifficultyTier,
    stake: u64,
    digest_blocks: u32,
    draw_size: usize,
) -> Replay {
    let digest_hex = commit_extended(house_seed, player_seed, digest_blocks).to_hex();
    let draw = DrawExtractor::new(draw_size).extract(&digest_hex);
    let matched = selection.matches(&draw);
    let match_count = matched.len();
    let multiplier = PayoutTable::multiplier(tier, match_count);

    Replay {
        draw: draw.numbers().to_vec(),
        draw_complete: draw.is_complete(),
        matched,
        match_count,
        multiplier,
        payout: PayoutTable::payout(stake, multiplier),
        house_seed_hash: house_seed.commitment_hash(),
        digest_hex,
    }
}

/// Field-by-field comparison of a record against its replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundVerification {
    pub replay: Replay,
    pub digest_matches: bool,
    pub draw_matches: bool,
    pub payout_matches: bool,
    pub house_hash_matches: bool,
}

impl RoundVerification {
    pub fn is_valid(&self) -> bool {
        self.digest_matches && self.draw_matches && self.payout_matches && self.house_hash_matches
    }
}

/// Check a settled round record. The digest block count is inferred from the
/// recorded digest length.
pub fn verify_record(record: &RoundRecord) -> Result<RoundVerification, VerificationError> {
    let house_seed = Seed::from_hex(&record.audit.house_seed).map_err(|e| {
        VerificationError::InvalidAuditField {
            field: "house_seed",
            reason: e.to_string(),
        }
    })?;
    let player_seed = Seed::from_hex(&record.audit.player_seed).map_err(|e| {
        VerificationError::InvalidAuditField {
            field: "player_seed",
            reason: e.to_string(),
        }
    })?;

    let digest_hex_len = record.audit.digest_hex.len();
    let block_hex_len = BLOCK_LEN * 2;
    if digest_hex_len == 0 || digest_hex_len % block_hex_len != 0 {
        return Err(VerificationError::InvalidAuditField {
            field: "digest_hex",
            reason: format!(
                "length {} is not a multiple of {}",
                digest_hex_len, block_hex_len
            ),
        });
    }
    let digest_blocks = digest_hex_len / block_hex_len;
    if digest_blocks > MAX_DIGEST_BLOCKS as usize {
        return Err(VerificationError::InvalidAuditField {
            field: "digest_hex",
            reason: format!("{} blocks exceeds the limit of {}", digest_blocks, MAX_DIGEST_BLOCKS),
        });
    }

    let replay = replay(
        &house_seed,
        &player_seed,
        &record.selection,
        record.tier,
        record.stake,
        digest_blocks as u32,
        record.draw_size,
    );

    let verification = RoundVerification {
        digest_matches: replay.digest_hex.eq_ignore_ascii_case(&record.audit.digest_hex),
        draw_matches: replay.draw == record.draw,
        payout_matches: replay.payout == record.settlement.payout
            && replay.match_count == record.settlement.match_count,
        house_hash_matches: replay
            .house_seed_hash
            .eq_ignore_ascii_case(&record.audit.house_seed_hash),
        replay,
    };

    if !verification.is_valid() {
        tracing::warn!(round_id = %record.round_id, "Round record failed verification");
    }

    Ok(verification)
}
