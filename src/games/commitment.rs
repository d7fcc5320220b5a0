//! Keyed one-way combination of the house and player seeds.
//!
//! Keying convention: HMAC-SHA256 with the raw house-seed bytes as the key
//! and the raw player-seed bytes as the message. Block 0 of the digest is
//! exactly `HMAC(house, player)`; block `i >= 1` is
//! `HMAC(house, player || u32_be(i))`. The digest is the concatenation of
//! the blocks, so a one-block digest is the plain HMAC output.

use crate::games::types::{Seed, SEED_LEN};
use hmac::digest::Key;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes produced by one HMAC-SHA256 block
pub const BLOCK_LEN: usize = 32;

/// Upper bound on blocks in one digest
pub const MAX_DIGEST_BLOCKS: u32 = 64;

/// Deterministic randomness source for a single round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitmentDigest {
    bytes: Vec<u8>,
}

impl CommitmentDigest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn block_count(&self) -> usize {
        self.bytes.len() / BLOCK_LEN
    }

    /// Fixed-length lowercase hex rendering (64 characters per block)
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// Single-block commitment: `HMAC-SHA256(key = house, msg = player)`
pub fn commit(house_seed: &Seed, player_seed: &Seed) -> CommitmentDigest {
    commit_extended(house_seed, player_seed, 1)
}

/// Multi-block commitment. `blocks` is clamped to `1..=MAX_DIGEST_BLOCKS`.
pub fn commit_extended(house_seed: &Seed, player_seed: &Seed, blocks: u32) -> CommitmentDigest {
    let blocks = blocks.clamp(1, MAX_DIGEST_BLOCKS);

    // HMAC zero-pads short keys to the SHA-256 block, so this is the raw seed key
    let mut key = Key::<HmacSha256>::default();
    key[..SEED_LEN].copy_from_slice(house_seed.as_bytes());
    let keyed = <HmacSha256 as Mac>::new(&key);

    let mut bytes = Vec::with_capacity(blocks as usize * BLOCK_LEN);
    for counter in 0..blocks {
        let mut mac = keyed.clone();
        mac.update(player_seed.as_bytes());
        if counter > 0 {
            mac.update(&counter.to_be_bytes());
        }
        bytes.extend_from_slice(&mac.finalize().into_bytes());
    }

    CommitmentDigest { bytes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_seeds() -> (Seed, Seed) {
        (
            Seed::from_hex(&"A".repeat(64)).unwrap(),
            Seed::from_hex(&"B".repeat(64)).unwrap(),
        )
    }

    #[test]
    fn test_single_block_vector() {
        let (house, player) = vector_seeds();
        let digest = commit(&house, &player);

        assert_eq!(
            digest.to_hex(),
            "94a7c95aed2171b1ebe335052a8bb690df9563adf3462d9e8d52304e48d982ec"
        );
        assert_eq!(digest.block_count(), 1);
    }

    #[test]
    fn test_extended_digest_starts_with_plain_hmac() {
        let (house, player) = vector_seeds();
        let single = commit(&house, &player);
        let extended = commit_extended(&house, &player, 8);

        assert_eq!(extended.block_count(), 8);
        assert_eq!(extended.to_hex().len(), 512);
        assert!(extended.to_hex().starts_with(&single.to_hex()));
        assert_eq!(
            &extended.to_hex()[64..128],
            "6d623ce2b8bec50699f7840b962a185d2fd7924efb69cdb50f6309ba5695d970"
        );
    }

    #[test]
    fn test_commitment_is_deterministic() {
        let (house, player) = vector_seeds();
        assert_eq!(commit_extended(&house, &player, 4), commit_extended(&house, &player, 4));
    }

    #[test]
    fn test_block_count_is_bounded() {
        let (house, player) = vector_seeds();

        assert_eq!(commit_extended(&house, &player, 0).block_count(), 1);
        assert_eq!(
            commit_extended(&house, &player, u32::MAX).block_count(),
            MAX_DIGEST_BLOCKS as usize
        );
    }

    #[test]
    fn test_padded_key_matches_raw_seed_key() {
        let (house, player) = vector_seeds();
        let mut mac = HmacSha256::new_from_slice(house.as_bytes()).unwrap();
        mac.update(player.as_bytes());

        assert_eq!(commit(&house, &player).as_bytes(), &mac.finalize().into_bytes()[..]);
    }

    #[test]
    fn test_swapping_key_and_message_changes_digest() {
        let (house, player) = vector_seeds();
        assert_ne!(commit(&house, &player), commit(&player, &house));
    }
}
