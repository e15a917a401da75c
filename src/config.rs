use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::chain::ChainConfig;
use crate::core::ranking::RankedCandidateSource;
use crate::models::{ScoreCaps, ScoreWeights};

/// Engine configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Default incoming-request cap for profiles without their own.
    #[serde(default = "default_receive_limit")]
    pub receive_limit: u32,
    /// Emergency activation lifetime in seconds.
    #[serde(default = "default_emergency_window_secs")]
    pub emergency_window_secs: u64,
    /// Apply the candidate's preference rule back onto the viewer.
    #[serde(default)]
    pub reciprocal_preference: bool,
    #[serde(default = "default_feed_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            receive_limit: default_receive_limit(),
            emergency_window_secs: default_emergency_window_secs(),
            reciprocal_preference: false,
            default_limit: default_feed_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_receive_limit() -> u32 {
    19
}
fn default_emergency_window_secs() -> u64 {
    3600
}
fn default_feed_limit() -> usize {
    50
}
fn default_max_limit() -> usize {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_half_life_hours")]
    pub half_life_hours: f64,
    #[serde(default)]
    pub caps: ScoreCaps,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            half_life_hours: default_half_life_hours(),
            caps: ScoreCaps::default(),
            weights: ScoreWeights::default(),
        }
    }
}

fn default_half_life_hours() -> f64 {
    12.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables.
    ///
    /// Later sources override earlier ones:
    /// 1. Struct defaults
    /// 2. config/default.toml
    /// 3. config/local.toml (development overrides)
    /// 4. Environment variables prefixed TZCHAT__
    ///    (e.g. TZCHAT__MATCHING__EMERGENCY_WINDOW_SECS -> matching.emergency_window_secs)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("TZCHAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("TZCHAT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// The chain knobs this configuration implies.
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            default_receive_limit: self.matching.receive_limit,
            emergency_window_secs: self.matching.emergency_window_secs,
            reciprocal_preference: self.matching.reciprocal_preference,
        }
    }

    /// A ranked-feed source capped at the configured maximum page size.
    pub fn ranked_source(&self) -> RankedCandidateSource {
        RankedCandidateSource::new(self.matching.max_limit)
    }
}
