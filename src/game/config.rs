//! Game Configuration
//!
//! Rules that differ between product iterations are configuration, not
//! literals: round length, win threshold, match policy and what a timeout
//! does to the turn.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matching::MatchPolicy;

/// Round length of the quick preset (seconds).
pub const QUICK_ROUND_SECONDS: u32 = 120;

/// Round length of the relaxed preset (seconds).
pub const RELAXED_ROUND_SECONDS: u32 = 300;

/// First player to reach this score wins.
pub const WIN_THRESHOLD: u32 = 5;

/// Confidence given to a target rebuilt from a challenge link.
pub const DEFAULT_TARGET_CONFIDENCE: f32 = 0.9;

/// What happens to the turn when the countdown runs out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// The failed finder forfeits the turn; the originator goes again.
    #[default]
    FlipTurn,
    /// The round simply ends; the finder keeps the turn.
    KeepTurn,
}

/// Configuration for a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Countdown per round (seconds)
    pub round_seconds: u32,
    /// Score that ends the game
    pub win_threshold: u32,
    /// Threshold used for single-candidate submissions
    pub match_policy: MatchPolicy,
    /// Turn handling on timeout
    pub timeout_policy: TimeoutPolicy,
    /// Confidence of targets hydrated from a challenge link
    pub default_confidence: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::quick()
    }
}

impl GameConfig {
    /// Two-minute rounds.
    pub fn quick() -> Self {
        Self {
            round_seconds: QUICK_ROUND_SECONDS,
            win_threshold: WIN_THRESHOLD,
            match_policy: MatchPolicy::Strict,
            timeout_policy: TimeoutPolicy::FlipTurn,
            default_confidence: DEFAULT_TARGET_CONFIDENCE,
        }
    }

    /// Five-minute rounds.
    pub fn relaxed() -> Self {
        Self {
            round_seconds: RELAXED_ROUND_SECONDS,
            ..Self::quick()
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject configurations the state machine cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_seconds == 0 {
            return Err(ConfigError::Invalid("round_seconds must be positive".into()));
        }
        if self.win_threshold == 0 {
            return Err(ConfigError::Invalid("win_threshold must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.default_confidence) {
            return Err(ConfigError::Invalid("default_confidence must be within [0, 1]".into()));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON.
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
