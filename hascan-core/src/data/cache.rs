//! Response caching with an explicit time-to-live.
//!
//! `CachingProvider` decorates any [`DataProvider`] with a [`FetchCache`]. The
//! cache is injected, never process-global, so tests can swap in a fresh one or
//! skip it entirely. Two stores are provided:
//! - [`MemoryCache`]: in-process map, for long-lived callers.
//! - [`DiskCache`]: one JSON file per request under a directory, so separate
//!   CLI runs within the TTL reuse downloads.
//!
//! Only successful fetches are cached, empty ones included (a delisted symbol
//! stays empty for the TTL). Errors always go back to the inner provider.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::RawBar;

/// Identity of one provider request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CacheKey {
    pub fn new(symbol: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: symbol.to_string(),
            start,
            end,
        }
    }
}

/// Storage for provider responses.
pub trait FetchCache: Send + Sync {
    /// Cached bars for `key` if present and younger than the TTL.
    fn get(&self, key: &CacheKey) -> Option<Vec<RawBar>>;

    fn put(&self, key: &CacheKey, bars: &[RawBar]) -> Result<(), DataError>;

    fn ttl(&self) -> Duration;
}

// ── In-memory store ─────────────────────────────────────────────────

#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Vec<RawBar>)>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry older than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl FetchCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<RawBar>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, bars) = entries.get(key)?;
        (stored_at.elapsed() < self.ttl).then(|| bars.clone())
    }

    fn put(&self, key: &CacheKey, bars: &[RawBar]) -> Result<(), DataError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), (Instant::now(), bars.to_vec()));
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ── Disk store ──────────────────────────────────────────────────────

/// On-disk record for one cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub key: CacheKey,
    pub fetched_at: DateTime<Utc>,
    pub bars: Vec<RawBar>,
}

/// Layout: `{cache_dir}/{SYMBOL}-{hash16}.json`, where the hash covers the full key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl DiskCache {
    /// Creates the directory if it doesn't exist.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, DataError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)
            .map_err(|e| DataError::CacheError(format!("failed to create cache dir: {e}")))?;
        Ok(Self { cache_dir, ttl })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let digest = blake3::hash(format!("{}|{}|{}", key.symbol, key.start, key.end).as_bytes());
        let hex = digest.to_hex();
        let safe_symbol: String = key
            .symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.cache_dir
            .join(format!("{safe_symbol}-{}.json", &hex.as_str()[..16]))
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        match (Utc::now() - fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // fetched_at in the future: clock moved backwards, treat as fresh
            Err(_) => true,
        }
    }

    /// Remove every entry older than the TTL. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize, DataError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let stale = match read_entry(&path) {
                Ok(cached) => !self.is_fresh(cached.fetched_at),
                Err(_) => true,
            };
            if stale {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn read_entry(path: &Path) -> Result<CachedResponse, DataError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| DataError::CacheError(format!("corrupt cache entry {}: {e}", path.display())))
}

impl FetchCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<RawBar>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        match read_entry(&path) {
            Ok(cached) if cached.key == *key && self.is_fresh(cached.fetched_at) => {
                Some(cached.bars)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn put(&self, key: &CacheKey, bars: &[RawBar]) -> Result<(), DataError> {
        // JSON has no NaN; void bars would never survive canonicalization anyway.
        let record = CachedResponse {
            key: key.clone(),
            fetched_at: Utc::now(),
            bars: bars.iter().filter(|b| !b.is_void()).copied().collect(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| DataError::CacheError(format!("serialize cache entry: {e}")))?;

        let path = self.entry_path(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;
        Ok(())
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ── Decorator ───────────────────────────────────────────────────────

/// A provider that answers from `cache` when it can and fills it otherwise.
#[derive(Clone)]
pub struct CachingProvider {
    inner: Arc<dyn DataProvider>,
    cache: Arc<dyn FetchCache>,
    name: String,
}

impl CachingProvider {
    pub fn new(inner: Arc<dyn DataProvider>, cache: Arc<dyn FetchCache>) -> Self {
        let name = format!("cached({})", inner.name());
        Self { inner, cache, name }
    }
}

impl DataProvider for CachingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let key = CacheKey::new(symbol, start, end);
        if let Some(bars) = self.cache.get(&key) {
            tracing::trace!(symbol, "cache hit");
            return Ok(FetchResult {
                symbol: symbol.to_string(),
                bars,
                source: DataSource::Cache,
            });
        }

        let result = self.inner.fetch(symbol, start, end)?;
        if let Err(e) = self.cache.put(&key, &result.bars) {
            // A cache that can't be written only costs a re-download.
            tracing::warn!(symbol, error = %e, "failed to store response in cache");
        }
        Ok(result)
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
