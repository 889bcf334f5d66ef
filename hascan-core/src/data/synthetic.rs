//! Synthetic provider: a seeded random walk per symbol.
//!
//! For demos and offline runs only. The walk is a pure function of
//! `(seed, symbol, start, end)`, so repeated scans see identical data.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::RawBar;

#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    start_price: f64,
    /// Symbols that behave like delisted instruments and return no bars.
    missing: Vec<String>,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: 100.0,
            missing: Vec::new(),
        }
    }

    /// Make the listed symbols return empty history.
    pub fn with_missing<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing.extend(symbols.into_iter().map(Into::into));
        self
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Weekday bars from `start` to `end` inclusive.
    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<RawBar> {
        let mut rng = self.rng_for(symbol);
        let mut bars = Vec::new();
        let mut price = self.start_price;

        for current in start.iter_days().take_while(|d| *d <= end) {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64);

            bars.push(RawBar::new(current, open, high, low, close).with_volume(volume));
            price = close;
        }

        bars
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if self.missing.iter().any(|m| m == symbol) {
            return Ok(FetchResult::empty(symbol, DataSource::Synthetic));
        }
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars: self.generate(symbol, start, end),
            source: DataSource::Synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn skips_weekends_and_produces_sane_bars() {
        // 2024-01-06/07 is a weekend.
        let bars = SyntheticProvider::new(7).generate("AAA", d(1), d(14));
        assert_eq!(bars.len(), 10);
        assert!(bars.iter().all(RawBar::is_sane));
        assert!(bars
            .iter()
            .all(|b| !matches!(b.date.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn same_seed_same_walk() {
        let a = SyntheticProvider::new(1).generate("AAA", d(1), d(31));
        let b = SyntheticProvider::new(1).generate("AAA", d(1), d(31));
        assert_eq!(a, b);
    }

    #[test]
    fn symbols_get_different_walks() {
        let p = SyntheticProvider::new(1);
        assert_ne!(p.generate("AAA", d(1), d(31)), p.generate("BBB", d(1), d(31)));
    }

    #[test]
    fn missing_symbols_return_empty() {
        let p = SyntheticProvider::new(1).with_missing(["GONE"]);
        assert!(p.fetch("GONE", d(1), d(31)).unwrap().is_empty());
        assert!(!p.fetch("HERE", d(1), d(31)).unwrap().is_empty());
    }
}
