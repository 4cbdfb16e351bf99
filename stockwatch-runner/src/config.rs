//! Watcher configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! data_root = "data"
//! csv_mirror = true
//! parallelism = 4
//!
//! [engine]
//! capacity = 20
//!
//! [engine.gap]
//! gap_fill_span = 10
//!
//! [http]
//! timeout_secs = 10
//!
//! [breaker]
//! cooldown_secs = 1800
//!
//! [sources]
//! yahoo_base_url = "https://query1.finance.yahoo.com"
//!
//! [watchlist]
//! kr = "docs/PORTFOLIO.md"
//! us = "docs/PORTFOLIO_US.md"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stockwatch_core::data::http::MAX_RETRIES_LIMIT;
use stockwatch_core::data::{naver, yahoo, CircuitBreaker, HttpSettings};
use stockwatch_core::domain::{Market, WINDOW_CAPACITY};
use stockwatch_core::engine::{GapPolicy, WindowMerger};
use stockwatch_core::store::JsonStore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Windows live under `{data_root}/{market}/stock_{SYMBOL}.json`.
    pub data_root: PathBuf,
    /// Write a CSV copy of every saved window.
    pub csv_mirror: bool,
    /// Worker threads for batch updates; 0 lets rayon decide.
    pub parallelism: usize,
    pub engine: EngineConfig,
    pub http: HttpSettings,
    pub breaker: BreakerConfig,
    pub sources: SourcesConfig,
    pub watchlist: WatchlistConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Records kept per symbol.
    pub capacity: usize,
    pub gap: GapPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    pub cooldown_secs: u64,
    pub failure_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub naver_base_url: String,
    pub yahoo_base_url: String,
}

/// Markdown documents holding each market's watch-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistConfig {
    pub kr: PathBuf,
    pub us: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            csv_mirror: false,
            parallelism: 4,
            engine: EngineConfig::default(),
            http: HttpSettings::default(),
            breaker: BreakerConfig::default(),
            sources: SourcesConfig::default(),
            watchlist: WatchlistConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: WINDOW_CAPACITY,
            gap: GapPolicy::default(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30 * 60,
            failure_threshold: 3,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            naver_base_url: naver::DEFAULT_BASE_URL.to_string(),
            yahoo_base_url: yahoo::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            kr: PathBuf::from("docs/PORTFOLIO.md"),
            us: PathBuf::from("docs/PORTFOLIO_US.md"),
        }
    }
}

impl WatchConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.capacity == 0 {
            return Err(ConfigError::Invalid("engine.capacity must be at least 1".into()));
        }
        if engine.gap.cold_start_span == 0 || engine.gap.gap_fill_span == 0 {
            return Err(ConfigError::Invalid("fetch spans must be at least 1".into()));
        }
        // A threshold above capacity could never be met: every run would cold start.
        if engine.gap.full_window > engine.capacity {
            return Err(ConfigError::Invalid(format!(
                "engine.gap.full_window ({}) exceeds engine.capacity ({})",
                engine.gap.full_window, engine.capacity
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        if self.http.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "http.max_retries ({}) exceeds {MAX_RETRIES_LIMIT}",
                self.http.max_retries
            )));
        }
        Ok(())
    }

    /// Directory holding one market's windows.
    pub fn market_dir(&self, market: Market) -> PathBuf {
        self.data_root.join(market.data_subdir())
    }

    pub fn store(&self, market: Market) -> JsonStore {
        JsonStore::new(self.market_dir(market)).with_csv_mirror(self.csv_mirror)
    }

    pub fn merger(&self) -> WindowMerger {
        WindowMerger::new(self.engine.capacity)
    }

    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            Duration::from_secs(self.breaker.cooldown_secs),
            self.breaker.failure_threshold,
        ))
    }

    pub fn watchlist_path(&self, market: Market) -> &Path {
        match market {
            Market::Kr => &self.watchlist.kr,
            Market::Us => &self.watchlist.us,
        }
    }
}
