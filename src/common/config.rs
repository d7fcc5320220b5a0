//! Configuration management for the keno engine
//!
//! TOML file, then `KENO_*` environment overrides, then validation.

use crate::errors::{ConfigurationError, KenoResult};
use crate::games::payout::DifficultyTier;
use crate::games::commitment::MAX_DIGEST_BLOCKS;
use crate::games::types::{CommitmentMode, DEFAULT_DRAW_SIZE, MAX_DRAW_SIZE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KenoConfig {
    pub engine: EngineConfig,
    pub draw: DrawConfig,
    pub reveal: RevealConfig,
}

/// Balance, stake and commitment defaults for a new engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_balance: u64,
    pub default_stake: u64,
    pub default_tier: DifficultyTier,
    pub commitment_mode: CommitmentMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            default_stake: 1,
            default_tier: DifficultyTier::Easy,
            commitment_mode: CommitmentMode::FreshPerRound,
        }
    }
}

/// Draw sizing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// Numbers revealed per round
    pub draw_size: usize,
    /// HMAC blocks concatenated into the commitment digest; each block
    /// supplies eight 32-bit windows
    pub digest_blocks: u32,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            draw_size: DEFAULT_DRAW_SIZE,
            digest_blocks: 8,
        }
    }
}

/// Cosmetic pacing of the reveal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub reveal_delay_ms: u64,
    pub settle_delay_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 100,
            settle_delay_ms: 2000,
        }
    }
}

impl RevealConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// No pacing at all
    pub fn instant() -> Self {
        Self {
            reveal_delay_ms: 0,
            settle_delay_ms: 0,
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> KenoResult<KenoConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            KenoConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> KenoResult<KenoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut KenoConfig) -> KenoResult<()> {
        apply_overrides(config, |key| env::var(key).ok())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &KenoConfig) -> KenoResult<()> {
        if config.engine.default_stake == 0 {
            return Err(invalid("engine.default_stake", "0", "Stake must be at least 1"));
        }

        if config.engine.default_stake > config.engine.starting_balance {
            return Err(invalid(
                "engine.default_stake",
                &config.engine.default_stake.to_string(),
                "Default stake cannot exceed the starting balance",
            ));
        }

        if config.draw.draw_size == 0 || config.draw.draw_size > MAX_DRAW_SIZE {
            return Err(invalid(
                "draw.draw_size",
                &config.draw.draw_size.to_string(),
                &format!("Draw size must be between 1 and {}", MAX_DRAW_SIZE),
            ));
        }

        if config.draw.digest_blocks == 0 || config.draw.digest_blocks > MAX_DIGEST_BLOCKS {
            return Err(invalid(
                "draw.digest_blocks",
                &config.draw.digest_blocks.to_string(),
                &format!("Digest blocks must be between 1 and {}", MAX_DIGEST_BLOCKS),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &KenoConfig, path: &str) -> KenoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn apply_overrides<F>(config: &mut KenoConfig, lookup: F) -> KenoResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("KENO_STARTING_BALANCE") {
        config.engine.starting_balance = parse_var("KENO_STARTING_BALANCE", value, "Invalid balance")?;
    }
    if let Some(value) = lookup("KENO_DEFAULT_STAKE") {
        config.engine.default_stake = parse_var("KENO_DEFAULT_STAKE", value, "Invalid stake")?;
    }
    if let Some(value) = lookup("KENO_DEFAULT_TIER") {
        config.engine.default_tier = parse_var("KENO_DEFAULT_TIER", value, "Unknown tier")?;
    }
    if let Some(value) = lookup("KENO_DRAW_SIZE") {
        config.draw.draw_size = parse_var("KENO_DRAW_SIZE", value, "Invalid draw size")?;
    }
    if let Some(value) = lookup("KENO_DIGEST_BLOCKS") {
        config.draw.digest_blocks = parse_var("KENO_DIGEST_BLOCKS", value, "Invalid block count")?;
    }
    if let Some(value) = lookup("KENO_REVEAL_DELAY_MS") {
        config.reveal.reveal_delay_ms = parse_var("KENO_REVEAL_DELAY_MS", value, "Invalid delay")?;
    }
    if let Some(value) = lookup("KENO_SETTLE_DELAY_MS") {
        config.reveal.settle_delay_ms = parse_var("KENO_SETTLE_DELAY_MS", value, "Invalid delay")?;
    }

    Ok(())
}

fn parse_var<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> KenoResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::errors::KenoError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: KenoConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: KenoConfig::default(),
        }
    }

    pub fn starting_balance(mut self, balance: u64) -> Self {
        self.config.engine.starting_balance = balance;
        self
    }

    pub fn default_stake(mut self, stake: u64) -> Self {
        self.config.engine.default_stake = stake;
        self
    }

    pub fn default_tier(mut self, tier: DifficultyTier) -> Self {
        self.config.engine.default_tier = tier;
        self
    }

    pub fn commitment_mode(mut self, mode: CommitmentMode) -> Self {
        self.config.engine.commitment_mode = mode;
        self
    }

    pub fn draw(mut self, draw: DrawConfig) -> Self {
        self.config.draw = draw;
        self
    }

    pub fn reveal(mut self, reveal: RevealConfig) -> Self {
        self.config.reveal = reveal;
        self
    }

    pub fn build(self) -> KenoConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> KenoResult<()> {
    ConfigLoader::new().save(&KenoConfig::default(), path)
}
