//! Screen results, per-symbol outcomes, and ranking.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use hascan_core::pattern::ReversalSignal;
use hascan_core::{SmoothedBar, SmoothedSeries};

/// One instrument whose smoothed candles flipped from bearish to bullish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub symbol: String,
    /// Date of the bullish "yesterday" candle.
    pub signal_date: NaiveDate,
    /// haClose change from the day before yesterday to yesterday, in percent.
    pub pct_change: f64,
    pub day_before: SmoothedBar,
    pub yesterday: SmoothedBar,
    /// Full smoothed series, for charting.
    pub series: SmoothedSeries,
    /// Raw bars discarded before smoothing (invalid or duplicate dates).
    #[serde(default)]
    pub dropped_bars: usize,
}

impl ScreenResult {
    pub fn from_signal(
        symbol: impl Into<String>,
        signal: ReversalSignal,
        series: SmoothedSeries,
        dropped_bars: usize,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            signal_date: signal.signal_date(),
            pct_change: signal.pct_change,
            day_before: signal.day_before,
            yesterday: signal.yesterday,
            series,
            dropped_bars,
        }
    }
}

/// What happened to one symbol during a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Matched(Box<ScreenResult>),
    NoMatch,
    /// Data unavailable or unusable. The reason is for logs only.
    Skipped { reason: String },
    /// The scan was cancelled before this symbol finished.
    Cancelled,
}

impl SymbolOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Matched(_) => "match",
            Self::NoMatch => "no match",
            Self::Skipped { .. } => "skipped",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Order two results: larger `pct_change` first, then symbol ascending.
pub fn compare_results(a: &ScreenResult, b: &ScreenResult) -> Ordering {
    b.pct_change
        .total_cmp(&a.pct_change)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

/// Sort results into display order. Total and stable, so ranking twice is a no-op.
pub fn rank_results(results: &mut [ScreenResult]) {
    results.sort_by(compare_results);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(symbol: &str, pct: f64) -> ScreenResult {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let bar = SmoothedBar {
            date,
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: None,
        };
        ScreenResult {
            symbol: symbol.to_string(),
            signal_date: date,
            pct_change: pct,
            day_before: bar,
            yesterday: bar,
            series: SmoothedSeries::default(),
            dropped_bars: 0,
        }
    }

    fn symbols(results: &[ScreenResult]) -> Vec<&str> {
        results.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn ranks_by_pct_desc() {
        let mut rs = vec![result("A", 1.0), result("B", 3.0), result("C", -2.0)];
        rank_results(&mut rs);
        assert_eq!(symbols(&rs), ["B", "A", "C"]);
    }

    #[test]
    fn ties_break_by_symbol() {
        let mut rs = vec![result("ZZZ", 2.0), result("AAA", 2.0), result("MMM", 2.0)];
        rank_results(&mut rs);
        assert_eq!(symbols(&rs), ["AAA", "MMM", "ZZZ"]);
    }

    #[test]
    fn ranking_is_idempotent() {
        let mut rs = vec![result("B", 1.0), result("A", 1.0), result("C", 5.0)];
        rank_results(&mut rs);
        let once = rs.clone();
        rank_results(&mut rs);
        assert_eq!(rs, once);
    }

    #[test]
    fn nan_sorts_without_panicking() {
        let mut rs = vec![result("A", f64::NAN), result("B", 1.0)];
        rank_results(&mut rs);
        assert_eq!(rs.len(), 2);
    }

    #[test]
    fn outcome_predicates() {
        assert!(SymbolOutcome::Matched(Box::new(result("A", 1.0))).is_match());
        assert!(SymbolOutcome::Skipped { reason: "x".into() }.is_skipped());
        assert!(SymbolOutcome::Cancelled.is_cancelled());
        assert_eq!(SymbolOutcome::NoMatch.label(), "no match");
    }
}
