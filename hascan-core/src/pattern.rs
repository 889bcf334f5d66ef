//! Two-bar Heikin Ashi reversal: a bearish candle followed by a bullish one.
//!
//! The decision looks at positions n-3 ("day before yesterday") and n-2
//! ("yesterday"). The newest bar at n-1 may be an unfinished session and is
//! never part of the decision.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{SmoothedBar, SmoothedSeries};

/// Minimum smoothed bars needed to evaluate the pattern.
pub const MIN_PATTERN_BARS: usize = 3;

/// A matched reversal with the two bars that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReversalSignal {
    pub day_before: SmoothedBar,
    pub yesterday: SmoothedBar,
    /// Change in haClose from `day_before` to `yesterday`, in percent.
    pub pct_change: f64,
}

impl ReversalSignal {
    pub fn signal_date(&self) -> NaiveDate {
        self.yesterday.date
    }
}

/// The `(day_before, yesterday)` pair, or `None` when fewer than three bars exist.
pub fn decision_bars(series: &SmoothedSeries) -> Option<(&SmoothedBar, &SmoothedBar)> {
    let n = series.len();
    if n < MIN_PATTERN_BARS {
        return None;
    }
    Some((series.get(n - 3)?, series.get(n - 2)?))
}

/// `day_before` is bearish and `yesterday` is bullish. Dojis match neither side.
pub fn matches_reversal(day_before: &SmoothedBar, yesterday: &SmoothedBar) -> bool {
    day_before.is_bearish() && yesterday.is_bullish()
}

pub fn detect_reversal(series: &SmoothedSeries) -> Option<ReversalSignal> {
    let (day_before, yesterday) = decision_bars(series)?;
    if !matches_reversal(day_before, yesterday) {
        return None;
    }
    Some(ReversalSignal {
        day_before: *day_before,
        yesterday: *yesterday,
        pct_change: pct_change(day_before.close, yesterday.close),
    })
}

pub fn is_reversal(series: &SmoothedSeries) -> bool {
    detect_reversal(series).is_some()
}

/// Percentage change from `from` to `to`.
pub fn pct_change(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum Candle {
        Bull,
        Bear,
        Doji,
    }

    fn series(candles: &[Candle]) -> SmoothedSeries {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = candles
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (open, close) = match c {
                    Candle::Bull => (100.0, 102.0),
                    Candle::Bear => (102.0, 100.0),
                    Candle::Doji => (101.0, 101.0),
                };
                SmoothedBar {
                    date: base + chrono::Duration::days(i as i64),
                    open,
                    high: open.max(close) + 0.5,
                    low: open.min(close) - 0.5,
                    close,
                    volume: None,
                }
            })
            .collect();
        SmoothedSeries::from_bars(bars)
    }

    use Candle::*;

    #[test]
    fn bear_then_bull_matches() {
        assert!(is_reversal(&series(&[Bear, Bull, Bear])));
    }

    #[test]
    fn newest_bar_is_ignored() {
        assert!(is_reversal(&series(&[Bear, Bull, Bull])));
        assert!(is_reversal(&series(&[Bear, Bull, Doji])));
        assert!(!is_reversal(&series(&[Bull, Bear, Bull])));
    }

    #[test]
    fn both_bullish_does_not_match() {
        assert!(!is_reversal(&series(&[Bull, Bull, Bull])));
    }

    #[test]
    fn both_bearish_does_not_match() {
        assert!(!is_reversal(&series(&[Bear, Bear, Bull])));
    }

    #[test]
    fn bull_then_bear_does_not_match() {
        assert!(!is_reversal(&series(&[Bull, Bear, Bear])));
    }

    #[test]
    fn doji_before_bull_does_not_match() {
        assert!(!is_reversal(&series(&[Doji, Bull, Bear])));
        assert!(!is_reversal(&series(&[Bear, Doji, Bull])));
    }

    #[test]
    fn short_series_never_matches() {
        assert!(!is_reversal(&series(&[])));
        assert!(!is_reversal(&series(&[Bear])));
        assert!(!is_reversal(&series(&[Bear, Bull])));
    }

    #[test]
    fn only_last_three_bars_matter() {
        assert!(is_reversal(&series(&[Bull, Bull, Bull, Bear, Bull, Bear])));
        assert!(!is_reversal(&series(&[Bear, Bull, Bull, Bull, Bull, Bear])));
    }

    #[test]
    fn signal_carries_pct_change_and_dates() {
        let s = series(&[Bull, Bear, Bull, Bear]);
        let signal = detect_reversal(&s).unwrap();
        assert_eq!(signal.day_before.date, s.bars()[1].date);
        assert_eq!(signal.signal_date(), s.bars()[2].date);
        assert!((signal.pct_change - 2.0).abs() < 1e-12);
    }

    #[test]
    fn pct_change_basic() {
        assert!((pct_change(50.0, 55.0) - 10.0).abs() < 1e-12);
        assert!((pct_change(50.0, 45.0) + 10.0).abs() < 1e-12);
    }
}
