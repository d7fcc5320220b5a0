//! Error types for the keno draw engine
//!
//! Every engine operation rejects before it mutates: an `Err` leaves the
//! balance, selection, stake, tier, seeds and round state exactly as they were.

use thiserror::Error;

/// Root error type for all keno operations
#[derive(Debug, Error)]
pub enum KenoError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Rejections raised by the round engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("Invalid selection: {reason}")]
    InvalidSelection { reason: String },

    #[error("Insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: u64, balance: u64 },

    #[error("Invalid stake: {0}")]
    InvalidStake(String),

    #[error("Unknown difficulty tier: {0}")]
    UnknownTier(String),

    /// Configuration call outside `Idle`. A live `Round` mutably borrows its
    /// engine, so the borrow checker already rules this out for callers of
    /// the public API; the runtime check backs that up.
    #[error("Invalid state: expected {expected}, engine is {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Digest exhausted after {produced} of {requested} numbers")]
    DigestExhausted { produced: usize, requested: usize },
}

/// Malformed seed material
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("Invalid seed hex: {0}")]
    InvalidHex(String),

    #[error("Seed must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Failures while re-checking a settled round
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Invalid audit field {field}: {reason}")]
    InvalidAuditField { field: &'static str, reason: String },
}

pub type KenoResult<T> = Result<T, KenoError>;

impl RoundError {
    pub(crate) fn invalid_selection(reason: impl Into<String>) -> Self {
        RoundError::InvalidSelection {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let err = KenoError::from(RoundError::InsufficientBalance {
            stake: 50,
            balance: 20,
        });

        assert!(err.to_string().contains("Round error"));
        assert!(err.to_string().contains("stake 50"));
        assert!(err.to_string().contains("balance 20"));
    }

    #[test]
    fn test_configuration_error_details() {
        let err = ConfigurationError::InvalidValue {
            field: "draw.draw_size".to_string(),
            value: "0".to_string(),
            reason: "Draw size must be between 1 and 80".to_string(),
        };

        assert!(err.to_string().contains("draw.draw_size"));
        assert!(err.to_string().contains("'0'"));
    }

    #[test]
    fn test_error_conversion() {
        let err: KenoError = SeedError::InvalidLength {
            expected: 32,
            actual: 4,
        }
        .into();

        match err {
            KenoError::Seed(SeedError::InvalidLength { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 4);
            }
            other => panic!("Expected seed error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_source() {
        let err = KenoError::Round(RoundError::invalid_selection("empty"));
        assert!(err.source().is_some());
    }
}
