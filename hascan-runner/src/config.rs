//! Screener configuration, loadable from TOML.
//!
//! ```toml
//! lookback_days = 15
//! concurrency = 8
//! fetch_timeout_secs = 20
//! min_bars = 3
//! cache_ttl_secs = 3600
//! as_of = "2024-03-08"   # optional; defaults to the local date
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hascan_core::pattern::MIN_PATTERN_BARS;

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Calendar days of history requested per symbol.
    pub lookback_days: u32,
    /// Worker threads in the screener's pool.
    pub concurrency: usize,
    /// Per-symbol fetch deadline.
    pub fetch_timeout_secs: u64,
    /// Usable bars required after canonicalization.
    pub min_bars: usize,
    /// TTL for cached provider responses (used by whoever builds the cache).
    pub cache_ttl_secs: u64,
    /// Reference date for "today". `None` means the local date at scan time.
    pub as_of: Option<NaiveDate>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            lookback_days: 15,
            concurrency: 8,
            fetch_timeout_secs: 20,
            min_bars: MIN_PATTERN_BARS,
            cache_ttl_secs: 3600,
            as_of: None,
        }
    }
}

impl ScreenConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".into());
        }
        if self.lookback_days == 0 {
            return Err("lookback_days must be at least 1".into());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be at least 1".into());
        }
        if self.min_bars < MIN_PATTERN_BARS {
            return Err(format!(
                "min_bars must be at least {MIN_PATTERN_BARS}, got {}",
                self.min_bars
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// The fetch window for `today`: `[today + 1 - lookback, today + 1]`.
    ///
    /// The end is one day past today so the provider includes today's
    /// (possibly unfinished) session.
    pub fn window_for(&self, today: NaiveDate) -> ScanWindow {
        let end = today + chrono::Duration::days(1);
        let start = end - chrono::Duration::days(i64::from(self.lookback_days));
        ScanWindow { start, end }
    }

    pub fn window(&self) -> ScanWindow {
        self.window_for(self.today())
    }
}

/// Inclusive date range requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
