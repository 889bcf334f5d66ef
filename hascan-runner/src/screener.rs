//! Reversal screener: fan a symbol set out over a worker pool, smooth each
//! history, and keep the instruments whose candles just turned bullish.
//!
//! Per symbol:
//! 1. Fetch `[today + 1 - lookback, today + 1]` under a deadline.
//! 2. Canonicalize and smooth (`transform_lenient` with `min_bars`).
//! 3. Test bars n-3 / n-2 for the bearish → bullish flip.
//!
//! At most `concurrency` provider calls are in flight at once, counting
//! fetches that overran their deadline and were abandoned.
//!
//! Any failure in those steps skips the symbol; it never aborts the scan.
//! Only invalid configuration, an empty symbol set, or a pool that can't be
//! built fail the whole call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

use hascan_core::data::{DataError, DataProvider, FetchResult, SymbolSet};
use hascan_core::heikin_ashi::transform_lenient;
use hascan_core::pattern::detect_reversal;
use hascan_core::RawSeries;

use crate::config::{ScanWindow, ScreenConfig};
use crate::progress::{NoProgress, ScanProgress};
use crate::result::{rank_results, ScreenResult, SymbolOutcome};

/// How often a worker waiting on a fetch re-checks the cancel flag.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Counting gate on provider calls.
///
/// A slot is taken before the helper thread is spawned and handed to that
/// thread, so it is only returned once the provider call has really
/// finished, even if the worker stopped waiting long before.
struct FetchSlots {
    in_flight: Mutex<usize>,
    freed: Condvar,
    limit: usize,
}

impl FetchSlots {
    fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
            limit,
        })
    }

    /// Block until a slot is free. `None` if `cancel` is set first.
    fn acquire(self: &Arc<Self>, cancel: Option<&AtomicBool>) -> Option<FetchSlot> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *in_flight < self.limit {
                *in_flight += 1;
                return Some(FetchSlot(Arc::clone(self)));
            }
            if is_cancelled(cancel) {
                return None;
            }
            in_flight = self
                .freed
                .wait_timeout(in_flight, POLL_SLICE)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// A held slot; dropping it frees the slot.
struct FetchSlot(Arc<FetchSlots>);

impl Drop for FetchSlot {
    fn drop(&mut self) {
        let mut in_flight = self.0.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *in_flight = in_flight.saturating_sub(1);
        self.0.freed.notify_one();
    }
}

/// Errors that stop a scan before any symbol is screened.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("no symbols to screen")]
    EmptySymbolSet,

    #[error("invalid screen config: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Everything a scan produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Matches in rank order.
    pub results: Vec<ScreenResult>,
    /// Symbols that reached an outcome (everything except cancelled ones).
    pub scanned: usize,
    pub matched: usize,
    pub skipped: usize,
    pub cancelled: bool,
    /// BLAKE3 over every usable raw series, in sorted symbol order.
    pub data_fingerprint: String,
    pub window: ScanWindow,
    pub elapsed_secs: f64,
}

impl ScanReport {
    /// Scanned symbols that had data but no reversal.
    pub fn no_match(&self) -> usize {
        self.scanned - self.matched - self.skipped
    }
}

/// One symbol's outcome plus the raw series it was judged on, if any.
struct SymbolScan {
    symbol: String,
    outcome: SymbolOutcome,
    raw: Option<RawSeries>,
}

pub struct ReversalScreener {
    provider: Arc<dyn DataProvider>,
    config: ScreenConfig,
}

impl ReversalScreener {
    pub fn new(provider: Arc<dyn DataProvider>, config: ScreenConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Screen `symbols` and return the ranked matches.
    ///
    /// No matches is `Ok(vec![])`, not an error.
    pub fn screen(&self, symbols: &SymbolSet) -> Result<Vec<ScreenResult>, ScreenError> {
        Ok(self.scan(symbols, &NoProgress, None)?.results)
    }

    /// Screen `symbols` with progress reporting and cooperative cancellation.
    ///
    /// Setting `cancel` stops workers from starting new symbols and abandons
    /// in-flight fetches; whatever matched before that is kept.
    pub fn scan(
        &self,
        symbols: &SymbolSet,
        progress: &dyn ScanProgress,
        cancel: Option<&AtomicBool>,
    ) -> Result<ScanReport, ScreenError> {
        if symbols.is_empty() {
            return Err(ScreenError::EmptySymbolSet);
        }
        self.config.validate().map_err(ScreenError::InvalidConfig)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .thread_name(|i| format!("hascan-worker-{i}"))
            .build()
            .map_err(|e| ScreenError::ThreadPool(e.to_string()))?;

        let slots = FetchSlots::new(self.config.concurrency);
        let start_time = Instant::now();
        let window = self.config.window();
        let total = symbols.len();
        tracing::info!(
            symbols = total,
            provider = self.provider.name(),
            start = %window.start,
            end = %window.end,
            concurrency = self.config.concurrency,
            "starting reversal scan"
        );

        let scans: Vec<SymbolScan> = pool.install(|| {
            symbols
                .symbols()
                .par_iter()
                .enumerate()
                .map(|(index, symbol)| {
                    if is_cancelled(cancel) {
                        return SymbolScan {
                            symbol: symbol.clone(),
                            outcome: SymbolOutcome::Cancelled,
                            raw: None,
                        };
                    }
                    progress.on_start(symbol, index, total);
                    let scan = self.screen_symbol(symbol, window, &slots, cancel);
                    progress.on_complete(symbol, index, total, &scan.outcome);
                    scan
                })
                .collect()
        });

        let cancelled = is_cancelled(cancel) || scans.iter().any(|s| s.outcome.is_cancelled());
        let data_fingerprint = fingerprint(&scans);

        let mut results = Vec::new();
        let mut scanned = 0;
        let mut skipped = 0;
        for scan in scans {
            match scan.outcome {
                SymbolOutcome::Matched(result) => {
                    scanned += 1;
                    results.push(*result);
                }
                SymbolOutcome::NoMatch => scanned += 1,
                SymbolOutcome::Skipped { .. } => {
                    scanned += 1;
                    skipped += 1;
                }
                SymbolOutcome::Cancelled => {}
            }
        }
        rank_results(&mut results);

        let matched = results.len();
        progress.on_batch_complete(matched, skipped, total);
        if cancelled {
            tracing::warn!(scanned, total, "scan cancelled");
        }

        Ok(ScanReport {
            results,
            scanned,
            matched,
            skipped,
            cancelled,
            data_fingerprint,
            window,
            elapsed_secs: start_time.elapsed().as_secs_f64(),
        })
    }

    fn screen_symbol(
        &self,
        symbol: &str,
        window: ScanWindow,
        slots: &Arc<FetchSlots>,
        cancel: Option<&AtomicBool>,
    ) -> SymbolScan {
        let skip = |reason: String| {
            tracing::debug!(symbol, reason = %reason, "skipping symbol");
            SymbolScan {
                symbol: symbol.to_string(),
                outcome: SymbolOutcome::Skipped { reason },
                raw: None,
            }
        };

        let fetched = match self.fetch_with_timeout(symbol, window, slots, cancel) {
            Ok(fetched) => fetched,
            Err(DataError::Cancelled { .. }) => {
                return SymbolScan {
                    symbol: symbol.to_string(),
                    outcome: SymbolOutcome::Cancelled,
                    raw: None,
                }
            }
            Err(e) => return skip(e.to_string()),
        };
        if fetched.is_empty() {
            return skip("provider returned no bars".into());
        }

        let lenient = match transform_lenient(fetched.bars, self.config.min_bars) {
            Ok(lenient) => lenient,
            Err(e) => return skip(e.to_string()),
        };
        if lenient.dropped > 0 {
            tracing::debug!(symbol, dropped = lenient.dropped, "dropped unusable bars");
        }

        let outcome = match detect_reversal(&lenient.smoothed) {
            Some(signal) => SymbolOutcome::Matched(Box::new(ScreenResult::from_signal(
                symbol,
                signal,
                lenient.smoothed,
                lenient.dropped,
            ))),
            None => SymbolOutcome::NoMatch,
        };

        SymbolScan {
            symbol: symbol.to_string(),
            outcome,
            raw: Some(lenient.raw),
        }
    }

    /// Run the provider call on a helper thread and wait for it under the
    /// configured deadline, checking `cancel` every [`POLL_SLICE`].
    ///
    /// The call first waits for a free slot; the deadline starts once it
    /// has one. A fetch that overruns is abandoned: its thread finishes in
    /// the background, keeps the slot until then, and the result is dropped.
    fn fetch_with_timeout(
        &self,
        symbol: &str,
        window: ScanWindow,
        slots: &Arc<FetchSlots>,
        cancel: Option<&AtomicBool>,
    ) -> Result<FetchResult, DataError> {
        let Some(slot) = slots.acquire(cancel) else {
            return Err(DataError::Cancelled {
                symbol: symbol.to_string(),
            });
        };

        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        let owned = symbol.to_string();
        thread::Builder::new()
            .name(format!("fetch-{symbol}"))
            .spawn(move || {
                let result = provider.fetch(&owned, window.start, window.end);
                drop(slot);
                // The receiver is gone if the worker gave up; nothing to do then.
                let _ = tx.send(result);
            })?;

        let timeout = self.config.fetch_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            if is_cancelled(cancel) {
                return Err(DataError::Cancelled {
                    symbol: symbol.to_string(),
                });
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(DataError::Timeout {
                    symbol: symbol.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            match rx.recv_timeout((deadline - now).min(POLL_SLICE)) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DataError::Other(format!(
                        "fetch for '{symbol}' ended without a result"
                    )))
                }
            }
        }
    }
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Deterministic BLAKE3 hash over every usable raw series.
///
/// Covers dates and OHLCV in sorted symbol order, so it is independent of
/// which worker finished first.
fn fingerprint(scans: &[SymbolScan]) -> String {
    let mut usable: Vec<(&str, &RawSeries)> = scans
        .iter()
        .filter_map(|s| s.raw.as_ref().map(|raw| (s.symbol.as_str(), raw)))
        .collect();
    usable.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (symbol, raw) in usable {
        hasher.update(symbol.as_bytes());
        for bar in raw.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.unwrap_or(0).to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
