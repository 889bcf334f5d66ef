//! Progress callbacks for multi-symbol scans.

use crate::result::SymbolOutcome;

/// Progress callback for a scan.
///
/// Called from pool worker threads, so implementations must be `Sync`.
pub trait ScanProgress: Send + Sync {
    /// Called when a worker picks up a symbol.
    fn on_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol has an outcome.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, outcome: &SymbolOutcome);

    /// Called once after every symbol has been handled.
    fn on_batch_complete(&self, matched: usize, skipped: usize, total: usize);
}

/// Discards all progress.
pub struct NoProgress;

impl ScanProgress for NoProgress {
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_complete(&self, _symbol: &str, _index: usize, _total: usize, _outcome: &SymbolOutcome) {
    }

    fn on_batch_complete(&self, _matched: usize, _skipped: usize, _total: usize) {}
}

/// Reports progress as `tracing` events.
pub struct LogProgress;

impl ScanProgress for LogProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        tracing::debug!(symbol, "[{}/{}] screening", index + 1, total);
    }

    fn on_complete(&self, symbol: &str, index: usize, total: usize, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Matched(result) => tracing::info!(
                symbol,
                pct_change = result.pct_change,
                "[{}/{}] reversal",
                index + 1,
                total
            ),
            SymbolOutcome::Skipped { reason } => {
                tracing::debug!(symbol, reason = %reason, "[{}/{}] skipped", index + 1, total)
            }
            other => tracing::debug!(symbol, "[{}/{}] {}", index + 1, total, other.label()),
        }
    }

    fn on_batch_complete(&self, matched: usize, skipped: usize, total: usize) {
        tracing::info!(matched, skipped, total, "scan complete");
    }
}
