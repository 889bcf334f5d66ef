//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price-history sources (Yahoo Finance,
//! CSV directory, synthetic) so the screener can be pointed at a fake in tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RawBar;

/// Structured error types for data operations.
///
/// Every variant means "this symbol's history is unavailable right now". The
/// screener never lets one of these escape a single symbol.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("fetch for '{symbol}' timed out after {timeout_ms}ms")]
    Timeout { symbol: String, timeout_ms: u64 },

    #[error("fetch for '{symbol}' cancelled")]
    Cancelled { symbol: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a successful data fetch for a single symbol.
///
/// `bars` may be empty: unknown and delisted symbols come back empty rather
/// than as an error.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

impl FetchResult {
    pub fn empty(symbol: &str, source: DataSource) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars: Vec::new(),
            source,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Cache,
    Synthetic,
}

/// Trait for price-history providers.
///
/// Implementations handle the specifics of one source. Caching is a separate
/// decorator ([`crate::data::CachingProvider`]); providers don't know about it.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol over an inclusive date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_symbol() {
        let e = DataError::Timeout {
            symbol: "ENI.MI".into(),
            timeout_ms: 1500,
        };
        assert_eq!(e.to_string(), "fetch for 'ENI.MI' timed out after 1500ms");
    }

    #[test]
    fn empty_fetch_result() {
        let r = FetchResult::empty("X", DataSource::Synthetic);
        assert!(r.is_empty());
        assert_eq!(r.symbol, "X");
    }
}
