//! Heikin Ashi transform.
//!
//! haClose[i] = (open[i] + high[i] + low[i] + close[i]) / 4
//! haOpen[0]  = (open[0] + close[0]) / 2
//! haOpen[i]  = (haOpen[i-1] + haClose[i-1]) / 2
//! haHigh[i]  = max(high[i], haOpen[i], haClose[i])
//! haLow[i]   = min(low[i], haOpen[i], haClose[i])
//!
//! haOpen carries state from the previous smoothed bar, so a series is always
//! computed in one oldest-to-newest sweep. Parallelism belongs across symbols,
//! never inside a series.

use thiserror::Error;

use crate::domain::{BarError, RawBar, RawSeries, SmoothedBar, SmoothedSeries};

/// Errors from the transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] BarError),

    #[error("insufficient data: need {required} usable bars, got {got}")]
    InsufficientData { required: usize, got: usize },
}

/// Result of [`transform_lenient`]: the smoothed series plus what survived filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct LenientTransform {
    pub smoothed: SmoothedSeries,
    pub raw: RawSeries,
    /// Bars removed by canonicalization (invalid or duplicate dates).
    pub dropped: usize,
}

/// Transform a validated series. Cannot fail: [`RawSeries`] already guarantees
/// sane, strictly ordered bars.
pub fn transform(series: &RawSeries) -> SmoothedSeries {
    smooth_unchecked(series.bars())
}

/// Strict entry point: the first bad bar fails the whole input with `InvalidInput`.
pub fn transform_bars(bars: &[RawBar]) -> Result<SmoothedSeries, TransformError> {
    if bars.is_empty() {
        return Err(TransformError::InsufficientData {
            required: 1,
            got: 0,
        });
    }
    let series = RawSeries::new(bars.to_vec())?;
    Ok(transform(&series))
}

/// Screener policy: drop offending bars instead of rejecting the series, as long
/// as at least `min_bars` usable bars remain.
pub fn transform_lenient(
    bars: Vec<RawBar>,
    min_bars: usize,
) -> Result<LenientTransform, TransformError> {
    let canonical = RawSeries::canonicalize(bars);
    let dropped = canonical.dropped();
    let raw = canonical.series;

    let required = min_bars.max(1);
    if raw.len() < required {
        return Err(TransformError::InsufficientData {
            required,
            got: raw.len(),
        });
    }

    Ok(LenientTransform {
        smoothed: transform(&raw),
        raw,
        dropped,
    })
}

/// The bare recurrence over whatever bars it is given, without validation.
///
/// Exposed for callers that have their own validation and for checking the
/// arithmetic in isolation. Invalid input yields meaningless (but finite-in,
/// finite-out) candles rather than an error.
pub fn smooth_unchecked(bars: &[RawBar]) -> SmoothedSeries {
    let mut out = Vec::with_capacity(bars.len());
    let mut prev: Option<(f64, f64)> = None;

    for bar in bars {
        let ha_close = (bar.open + bar.high + bar.low + bar.close) / 4.0;
        let ha_open = match prev {
            None => (bar.open + bar.close) / 2.0,
            Some((prev_open, prev_close)) => (prev_open + prev_close) / 2.0,
        };
        let ha_high = bar.high.max(ha_open).max(ha_close);
        let ha_low = bar.low.min(ha_open).min(ha_close);

        out.push(SmoothedBar {
            date: bar.date,
            open: ha_open,
            high: ha_high,
            low: ha_low,
            close: ha_close,
            volume: bar.volume,
        });
        prev = Some((ha_open, ha_close));
    }

    SmoothedSeries::from_bars(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "assert_approx failed: actual={actual}, expected={expected}"
        );
    }

    fn make_bars(data: &[(f64, f64, f64, f64)]) -> Vec<RawBar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                RawBar::new(base + chrono::Duration::days(i as i64), o, h, l, c)
            })
            .collect()
    }

    /// Four bars from the reference example. The last one has high < open and is
    /// not a valid bar, which matters for the strict and lenient paths below.
    fn reference_bars() -> Vec<RawBar> {
        make_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 13.0, 10.0, 12.0),
            (12.0, 14.0, 11.0, 13.0),
            (13.0, 11.0, 10.0, 10.5),
        ])
    }

    #[test]
    fn recurrence_matches_reference_values() {
        let ha = smooth_unchecked(&reference_bars());
        let b = ha.bars();
        assert_eq!(b.len(), 4);

        assert_approx(b[0].open, 10.5);
        assert_approx(b[0].close, 10.5);
        assert_approx(b[1].open, 10.5);
        assert_approx(b[1].close, 11.5);
        assert_approx(b[2].open, 11.0);
        assert_approx(b[2].close, 12.5);
        assert_approx(b[3].open, 11.75);
        assert_approx(b[3].close, 11.125);

        for i in 1..b.len() {
            assert_approx(b[i].open, (b[i - 1].open + b[i - 1].close) / 2.0);
        }
    }

    #[test]
    fn high_low_envelope_includes_smoothed_body() {
        let ha = smooth_unchecked(&reference_bars());
        let b = ha.bars();
        assert_approx(b[0].high, 12.0);
        assert_approx(b[0].low, 9.0);
        // Bar 3: raw high 11 is below haOpen 11.75, so the smoothed high takes haOpen.
        assert_approx(b[3].high, 11.75);
        assert_approx(b[3].low, 10.0);
    }

    #[test]
    fn strict_transform_rejects_reference_fourth_bar() {
        let err = transform_bars(&reference_bars()).unwrap_err();
        assert!(matches!(
            err,
            TransformError::InvalidInput(BarError::BoundsViolated { .. })
        ));
    }

    #[test]
    fn strict_transform_rejects_empty() {
        assert_eq!(
            transform_bars(&[]),
            Err(TransformError::InsufficientData {
                required: 1,
                got: 0
            })
        );
    }

    #[test]
    fn strict_transform_accepts_single_bar() {
        let ha = transform_bars(&make_bars(&[(10.0, 12.0, 9.0, 11.0)])).unwrap();
        assert_eq!(ha.len(), 1);
    }

    #[test]
    fn lenient_transform_drops_bad_bar_and_keeps_going() {
        let out = transform_lenient(reference_bars(), 3).unwrap();
        assert_eq!(out.dropped, 1);
        assert_eq!(out.smoothed.len(), 3);
        assert_eq!(out.raw.len(), 3);
        assert_approx(out.smoothed.bars()[2].open, 11.0);
    }

    #[test]
    fn lenient_transform_fails_below_min_bars() {
        let mut bars = reference_bars();
        bars[0].close = f64::NAN;
        let err = transform_lenient(bars, 3).unwrap_err();
        assert_eq!(
            err,
            TransformError::InsufficientData {
                required: 3,
                got: 2
            }
        );
    }

    #[test]
    fn transform_is_deterministic() {
        let bars = make_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 13.0, 10.0, 12.0),
            (12.0, 14.0, 11.0, 13.0),
            (13.0, 13.5, 10.0, 10.5),
        ]);
        let a = transform_bars(&bars).unwrap();
        let b = transform_bars(&bars).unwrap();
        for (x, y) in a.bars().iter().zip(b.bars()) {
            assert_eq!(x.open.to_bits(), y.open.to_bits());
            assert_eq!(x.high.to_bits(), y.high.to_bits());
            assert_eq!(x.low.to_bits(), y.low.to_bits());
            assert_eq!(x.close.to_bits(), y.close.to_bits());
        }
    }

    #[test]
    fn volume_and_dates_are_carried_through() {
        let bars: Vec<RawBar> = make_bars(&[(10.0, 12.0, 9.0, 11.0), (11.0, 13.0, 10.0, 12.0)])
            .into_iter()
            .map(|b| b.with_volume(1_000))
            .collect();
        let ha = transform_bars(&bars).unwrap();
        assert_eq!(ha.bars()[1].volume, Some(1_000));
        assert_eq!(ha.bars()[1].date, bars[1].date);
    }
}
