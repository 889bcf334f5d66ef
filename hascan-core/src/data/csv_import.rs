//! CSV directory provider: one `{SYMBOL}.csv` file per instrument.
//!
//! Accepts the usual export header (`Date,Open,High,Low,Close,Volume`) in any
//! case, with `Volume` optional. Missing files mean "no data" for that symbol.
//! Empty cells load as NaN and are filtered out downstream like any void bar.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::RawBar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Date", alias = "DATE")]
    date: NaiveDate,
    #[serde(alias = "Open", alias = "OPEN")]
    open: Option<f64>,
    #[serde(alias = "High", alias = "HIGH")]
    high: Option<f64>,
    #[serde(alias = "Low", alias = "LOW")]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "CLOSE")]
    close: Option<f64>,
    #[serde(default, alias = "Volume", alias = "VOLUME")]
    volume: Option<f64>,
}

impl From<CsvRow> for RawBar {
    fn from(row: CsvRow) -> Self {
        RawBar {
            date: row.date,
            open: row.open.unwrap_or(f64::NAN),
            high: row.high.unwrap_or(f64::NAN),
            low: row.low.unwrap_or(f64::NAN),
            close: row.close.unwrap_or(f64::NAN),
            // Some exports write volume as a float ("1234.0").
            volume: row
                .volume
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64),
        }
    }
}

/// Reads daily history from a directory of CSV files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Parse every row of one CSV file, without date filtering.
    pub fn read_file(path: &Path) -> Result<Vec<RawBar>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::Csv(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| {
                DataError::Csv(format!("{} row {}: {e}", path.display(), line + 1))
            })?;
            bars.push(RawBar::from(row));
        }
        Ok(bars)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_directory"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            tracing::debug!(symbol, path = %path.display(), "no CSV file for symbol");
            return Ok(FetchResult::empty(symbol, DataSource::CsvImport));
        }

        let bars = Self::read_file(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }

    fn is_available(&self) -> bool {
        self.dir.is_dir()
    }
}
