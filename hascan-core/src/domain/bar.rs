//! Raw daily bars and the ordered series a provider hands to the transform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a raw bar (or a sequence of them) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{field} is not finite on {date}")]
    NonFinite { date: NaiveDate, field: &'static str },

    #[error("non-positive price on {date}")]
    NonPositive { date: NaiveDate },

    #[error(
        "OHLC bounds violated on {date}: open={open} high={high} low={low} close={close}"
    )]
    BoundsViolated {
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("dates not strictly increasing: {prev} followed by {next}")]
    OutOfOrder { prev: NaiveDate, next: NaiveDate },
}

/// One trading day for one instrument, as delivered by a provider.
///
/// Providers encode missing prices as NaN rather than failing the fetch; such
/// bars are void and get filtered out before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl RawBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Check `low <= min(open, close) <= max(open, close) <= high` on finite, positive prices.
    pub fn validate(&self) -> Result<(), BarError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(BarError::NonFinite {
                    date: self.date,
                    field,
                });
            }
        }

        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarError::NonPositive { date: self.date });
        }

        let body_low = self.open.min(self.close);
        let body_high = self.open.max(self.close);
        if self.low > body_low || body_high > self.high {
            return Err(BarError::BoundsViolated {
                date: self.date,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Ordered bars for one instrument: every bar sane, dates strictly increasing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawSeries {
    bars: Vec<RawBar>,
}

/// Output of [`RawSeries::canonicalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Canonicalized {
    pub series: RawSeries,
    /// Bars dropped for failing [`RawBar::validate`].
    pub invalid: usize,
    /// Bars dropped because an earlier bar already had the same date.
    pub duplicates: usize,
}

impl Canonicalized {
    pub fn dropped(&self) -> usize {
        self.invalid + self.duplicates
    }
}

impl RawSeries {
    /// Checked constructor: rejects the first invalid bar or ordering violation.
    pub fn new(bars: Vec<RawBar>) -> Result<Self, BarError> {
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(BarError::OutOfOrder {
                    prev: pair[0].date,
                    next: pair[1].date,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Sort by date, drop invalid bars, then keep the first bar per date.
    pub fn canonicalize(mut bars: Vec<RawBar>) -> Canonicalized {
        let total = bars.len();
        bars.retain(RawBar::is_sane);
        let invalid = total - bars.len();

        // Stable sort keeps provider order among same-date bars.
        bars.sort_by_key(|b| b.date);
        let before_dedup = bars.len();
        bars.dedup_by_key(|b| b.date);
        let duplicates = before_dedup - bars.len();

        Canonicalized {
            series: Self { bars },
            invalid,
            duplicates,
        }
    }

    pub fn bars(&self) -> &[RawBar] {
        &self.bars
    }

    pub fn into_bars(self) -> Vec<RawBar> {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_bar() -> RawBar {
        RawBar::new(day(2), 100.0, 105.0, 98.0, 103.0).with_volume(50_000)
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert_eq!(
            bar.validate(),
            Err(BarError::NonFinite {
                date: day(2),
                field: "open"
            })
        );
    }

    #[test]
    fn bar_detects_infinite_close() {
        let mut bar = sample_bar();
        bar.close = f64::INFINITY;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_high_below_open() {
        let mut bar = sample_bar();
        bar.high = 99.0;
        assert!(matches!(
            bar.validate(),
            Err(BarError::BoundsViolated { .. })
        ));
    }

    #[test]
    fn bar_detects_low_above_close() {
        let mut bar = sample_bar();
        bar.low = 101.0;
        bar.close = 100.5;
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_rejects_non_positive() {
        let bar = RawBar::new(day(2), 0.0, 1.0, 0.0, 0.5);
        assert_eq!(bar.validate(), Err(BarError::NonPositive { date: day(2) }));
    }

    #[test]
    fn doji_bar_is_sane() {
        let bar = RawBar::new(day(2), 10.0, 10.0, 10.0, 10.0);
        assert!(bar.is_sane());
    }

    #[test]
    fn series_rejects_out_of_order_dates() {
        let bars = vec![
            RawBar::new(day(3), 10.0, 11.0, 9.0, 10.5),
            RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5),
        ];
        assert_eq!(
            RawSeries::new(bars),
            Err(BarError::OutOfOrder {
                prev: day(3),
                next: day(2)
            })
        );
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let bars = vec![
            RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5),
            RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5),
        ];
        assert!(RawSeries::new(bars).is_err());
    }

    #[test]
    fn canonicalize_sorts_dedupes_and_filters() {
        let mut broken = RawBar::new(day(4), 10.0, 11.0, 9.0, 10.5);
        broken.high = f64::NAN;
        let bars = vec![
            RawBar::new(day(3), 12.0, 13.0, 11.0, 12.5),
            RawBar::new(day(2), 10.0, 11.0, 9.0, 10.5),
            RawBar::new(day(3), 99.0, 99.0, 99.0, 99.0),
            broken,
        ];

        let out = RawSeries::canonicalize(bars);
        assert_eq!(out.invalid, 1);
        assert_eq!(out.duplicates, 1);
        assert_eq!(out.dropped(), 2);
        assert_eq!(out.series.len(), 2);
        assert_eq!(out.series.first_date(), Some(day(2)));
        // First occurrence of day 3 wins.
        assert_eq!(out.series.bars()[1].open, 12.0);
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: RawBar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }

    #[test]
    fn bar_deserializes_without_volume() {
        let json = r#"{"date":"2024-01-02","open":1.0,"high":2.0,"low":0.5,"close":1.5}"#;
        let bar: RawBar = serde_json::from_str(json).unwrap();
        assert_eq!(bar.volume, None);
    }
}
