//! TOML configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stocksim::{DeskConfig, Price};

use crate::error::{Error, Result};

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub desk: DeskSection,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    /// Starting cash in dollars for a fresh account.
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
        }
    }
}

fn default_initial_cash() -> f64 {
    10_000.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeskSection {
    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_latency")]
    pub execution_latency_ms: u64,
}

impl Default for DeskSection {
    fn default() -> Self {
        Self {
            undo_capacity: default_undo_capacity(),
            history_capacity: default_history_capacity(),
            execution_latency_ms: default_latency(),
        }
    }
}

fn default_undo_capacity() -> usize {
    stocksim::undo::DEFAULT_UNDO_CAPACITY
}
fn default_history_capacity() -> usize {
    stocksim::history::DEFAULT_HISTORY_CAPACITY
}
fn default_latency() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Fixed RNG seed for reproducible price paths. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Interval between background price ticks; 0 disables them.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_interval_ms: default_tick_interval(),
        }
    }
}

fn default_tick_interval() -> u64 {
    3_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("stocksim.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Fill the leaderboard with generated rivals.
    #[serde(default = "default_true")]
    pub simulated_rivals: bool,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            simulated_rivals: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".into()
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    /// Load config from `path`, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if !self.account.initial_cash.is_finite() || self.account.initial_cash < 0.0 {
            return Err(Error::Config("initial_cash must be a non-negative amount".into()));
        }
        if self.storage.snapshot_path.as_os_str().is_empty() {
            return Err(Error::Config("snapshot_path must not be empty".into()));
        }
        self.desk_config().validate().map_err(Error::Config)
    }

    /// The core desk settings described by this config.
    pub fn desk_config(&self) -> DeskConfig {
        DeskConfig {
            initial_cash: Price::from_dollars(self.account.initial_cash).0,
            undo_capacity: self.desk.undo_capacity,
            history_capacity: self.desk.history_capacity,
            execution_latency: Duration::from_millis(self.desk.execution_latency_ms),
        }
    }

    /// Background price tick interval, if ticking is enabled.
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.feed.tick_interval_ms > 0).then(|| Duration::from_millis(self.feed.tick_interval_ms))
    }
}
