//! Heikin Ashi bars and series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One Heikin Ashi candle. Fields hold the smoothed values (`haOpen`, `haHigh`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Raw volume of the source bar, kept for display.
    #[serde(default)]
    pub volume: Option<u64>,
}

impl SmoothedBar {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body size as a percentage of the smoothed open (signed).
    pub fn body_pct(&self) -> f64 {
        (self.close - self.open) / self.open * 100.0
    }
}

/// Smoothed bars aligned one-to-one with the raw series they came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SmoothedSeries {
    bars: Vec<SmoothedBar>,
}

impl SmoothedSeries {
    /// Wrap already-smoothed bars. The caller is responsible for ordering.
    pub fn from_bars(bars: Vec<SmoothedBar>) -> Self {
        Self { bars }
    }

    pub fn bars(&self) -> &[SmoothedBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SmoothedBar> {
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&SmoothedBar> {
        self.bars.last()
    }

    /// The most recent `n` bars (all of them if the series is shorter).
    pub fn tail(&self, n: usize) -> &[SmoothedBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bars.iter().map(|b| b.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(d: u32, open: f64, close: f64) -> SmoothedBar {
        SmoothedBar {
            date: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: None,
        }
    }

    #[test]
    fn bullish_and_bearish_are_strict() {
        assert!(bar(2, 10.0, 11.0).is_bullish());
        assert!(bar(2, 11.0, 10.0).is_bearish());

        let doji = bar(2, 10.0, 10.0);
        assert!(!doji.is_bullish());
        assert!(!doji.is_bearish());
    }

    #[test]
    fn body_pct_is_signed() {
        assert!((bar(2, 10.0, 11.0).body_pct() - 10.0).abs() < 1e-12);
        assert!(bar(2, 10.0, 9.0).body_pct() < 0.0);
    }

    #[test]
    fn tail_clamps_to_length() {
        let series = SmoothedSeries::from_bars(vec![bar(2, 1.0, 2.0), bar(3, 2.0, 3.0)]);
        assert_eq!(series.tail(30).len(), 2);
        assert_eq!(series.tail(1)[0].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert!(series.tail(0).is_empty());
    }
}
