//! Hash-to-numbers extraction.
//!
//! The digest's hex rendering is scanned left to right in non-overlapping
//! 8-character (32-bit) windows. Each window maps to `(value % 80) + 1`;
//! repeats are skipped. Scanning stops once the draw is full or fewer than
//! 8 characters remain. There is no reseeding or wrap-around.

use crate::errors::RoundError;
use crate::games::types::{Draw, DEFAULT_DRAW_SIZE, MAX_DRAW_SIZE, NUMBER_RANGE};

/// Hex characters consumed per extracted candidate
pub const WINDOW_HEX_CHARS: usize = 8;

/// Deterministic, side-effect-free draw extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawExtractor {
    draw_size: usize,
}

impl Default for DrawExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_DRAW_SIZE)
    }
}

impl DrawExtractor {
    /// Sizes above [`MAX_DRAW_SIZE`] are clamped to it.
    pub fn new(draw_size: usize) -> Self {
        Self {
            draw_size: draw_size.min(MAX_DRAW_SIZE),
        }
    }

    pub fn draw_size(&self) -> usize {
        self.draw_size
    }

    /// Extract up to `draw_size` distinct numbers. A short draw is returned
    /// as-is when the digest runs out.
    pub fn extract(&self, digest_hex: &str) -> Draw {
        let mut numbers: Vec<u8> = Vec::with_capacity(self.draw_size);

        for window in digest_hex.as_bytes().chunks_exact(WINDOW_HEX_CHARS) {
            if numbers.len() >= self.draw_size {
                break;
            }

            let Some(value) = parse_window(window) else {
                tracing::warn!("Skipping non-hex digest window {:?}", String::from_utf8_lossy(window));
                continue;
            };

            let number = (value % NUMBER_RANGE as u32) as u8 + 1;
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }

        Draw::new(numbers, self.draw_size)
    }

    /// Like [`extract`](Self::extract) but fails with `DigestExhausted` when
    /// the full draw size could not be reached
    pub fn extract_strict(&self, digest_hex: &str) -> Result<Draw, RoundError> {
        let draw = self.extract(digest_hex);
        if draw.is_complete() {
            Ok(draw)
        } else {
            Err(RoundError::DigestExhausted {
                produced: draw.len(),
                requested: draw.requested(),
            })
        }
    }
}

fn parse_window(window: &[u8]) -> Option<u32> {
    if !window.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(window).ok()?;
    u32::from_str_radix(text, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_BLOCK_VECTOR: &str =
        "94a7c95aed2171b1ebe335052a8bb690df9563adf3462d9e8d52304e48d982ec";

    #[test]
    fn test_single_block_vector_is_short() {
        let draw = DrawExtractor::default().extract(SINGLE_BLOCK_VECTOR);

        assert_eq!(draw.numbers(), &[27, 66, 6, 33, 30, 47, 15, 61]);
        assert!(!draw.is_complete());
    }

    #[test]
    fn test_strict_extraction_reports_exhaustion() {
        let result = DrawExtractor::default().extract_strict(SINGLE_BLOCK_VECTOR);
        assert_eq!(
            result,
            Err(RoundError::DigestExhausted {
                produced: 8,
                requested: 20
            })
        );
    }

    #[test]
    fn test_duplicates_are_skipped_and_range_edges_map() {
        // 0 -> 1, 79 -> 80, 80 -> 1 (repeat), u32::MAX -> 16
        let digest = format!("{}{}{}{}", "00000000", "0000004f", "00000050", "ffffffff");
        let draw = DrawExtractor::default().extract(&digest);

        assert_eq!(draw.numbers(), &[1, 80, 16]);
    }

    #[test]
    fn test_stops_at_draw_size() {
        let digest: String = (0u32..40).map(|i| format!("{:08x}", i)).collect();
        let draw = DrawExtractor::new(5).extract(&digest);

        assert_eq!(draw.numbers(), &[1, 2, 3, 4, 5]);
        assert!(draw.is_complete());
    }

    #[test]
    fn test_oversized_draw_is_capped_at_twenty() {
        let digest: String = (0u32..80).map(|i| format!("{:08x}", i)).collect();
        let draw = DrawExtractor::new(40).extract(&digest);

        assert_eq!(DrawExtractor::new(40).draw_size(), 20);
        assert_eq!(draw.len(), 20);
        assert_eq!(draw.requested(), 20);
        assert!(draw.is_complete());
    }

    #[test]
    fn test_trailing_partial_window_is_ignored() {
        let draw = DrawExtractor::default().extract("0000000a0000");
        assert_eq!(draw.numbers(), &[11]);
    }

    #[test]
    fn test_uppercase_hex_matches_lowercase() {
        let lower = DrawExtractor::default().extract(SINGLE_BLOCK_VECTOR);
        let upper = DrawExtractor::default().extract(&SINGLE_BLOCK_VECTOR.to_uppercase());
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_draw_is_unique_and_in_range() {
        let digest: String = (0u32..200)
            .map(|i| format!("{:08x}", i.wrapping_mul(2_654_435_761)))
            .collect();
        let draw = DrawExtractor::default().extract(&digest);

        let mut seen = std::collections::HashSet::new();
        for number in draw.numbers() {
            assert!((1..=80).contains(number));
            assert!(seen.insert(*number), "duplicate {}", number);
        }
        assert!(draw.len() <= 20);
    }
}
