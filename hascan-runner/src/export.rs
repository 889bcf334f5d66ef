//! Export of screen results: JSON for tooling, CSV for spreadsheets.

use std::path::Path;

use anyhow::{Context, Result};

use crate::result::ScreenResult;
use crate::screener::ScanReport;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize ranked results (with their smoothed series) to pretty JSON.
pub fn export_json(results: &[ScreenResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize results to JSON")
}

/// Deserialize results previously written by [`export_json`].
pub fn import_json(json: &str) -> Result<Vec<ScreenResult>> {
    serde_json::from_str(json).context("failed to deserialize results from JSON")
}

/// Serialize a whole scan report, counts and fingerprint included.
pub fn export_report_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize scan report to JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per match, in rank order.
///
/// Columns: rank, symbol, signal_date, pct_change, day_before_open,
/// day_before_close, yesterday_open, yesterday_close, bars
pub fn export_csv(results: &[ScreenResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "symbol",
        "signal_date",
        "pct_change",
        "day_before_open",
        "day_before_close",
        "yesterday_open",
        "yesterday_close",
        "bars",
    ])?;

    for (i, r) in results.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &r.symbol,
            &r.signal_date.to_string(),
            &format!("{:.4}", r.pct_change),
            &format!("{:.4}", r.day_before.open),
            &format!("{:.4}", r.day_before.close),
            &format!("{:.4}", r.yesterday.open),
            &format!("{:.4}", r.yesterday.close),
            &r.series.len().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `contents` to `path`, creating parent directories.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hascan_core::{SmoothedBar, SmoothedSeries};

    fn sample_result(symbol: &str, pct: f64) -> ScreenResult {
        let bar = |day: u32, open: f64, close: f64| SmoothedBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open,
            high: open.max(close) + 0.5,
            low: open.min(close) - 0.5,
            close,
            volume: Some(1_000),
        };
        let day_before = bar(5, 11.5, 10.425);
        let yesterday = bar(6, 10.9625, 11.425);
        ScreenResult {
            symbol: symbol.to_string(),
            signal_date: yesterday.date,
            pct_change: pct,
            day_before,
            yesterday,
            series: SmoothedSeries::from_bars(vec![day_before, yesterday, bar(7, 11.2, 11.0)]),
            dropped_bars: 0,
        }
    }

    #[test]
    fn json_roundtrip() {
        let results = vec![sample_result("ENI.MI", 9.59), sample_result("ISP.MI", 1.25)];
        let json = export_json(&results).unwrap();
        let restored = import_json(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].symbol, "ENI.MI");
        assert_eq!(restored[0].signal_date, results[0].signal_date);
        assert!((restored[0].pct_change - 9.59).abs() < 1e-10);
        assert_eq!(restored[1].series.len(), 3);
        assert_eq!(restored[1].yesterday.volume, Some(1_000));
    }

    #[test]
    fn csv_header_and_rows() {
        let csv = export_csv(&[sample_result("ENI.MI", 9.5923), sample_result("ISP.MI", 1.0)])
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].split(',').count(), 9);
        assert!(lines[1].starts_with("1,ENI.MI,2024-03-06,9.5923,"));
        assert!(lines[2].starts_with("2,ISP.MI,"));
        assert!(lines[1].ends_with(",3"));
    }

    #[test]
    fn csv_of_nothing_is_header_only() {
        let csv = export_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn write_artifact_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/results.json");
        write_artifact(&path, "[]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
