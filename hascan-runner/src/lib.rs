//! HASCAN Runner: screening orchestration over `hascan-core`.
//!
//! This crate provides:
//! - `ScreenConfig` (TOML-loadable) and the scan window it implies
//! - `ReversalScreener`: bounded worker pool, per-fetch timeouts, cancellation
//! - Ranked `ScreenResult`s and a `ScanReport` with a data fingerprint
//! - Progress callbacks and JSON/CSV export

pub mod config;
pub mod export;
pub mod progress;
pub mod result;
pub mod screener;

pub use config::{ConfigError, ScanWindow, ScreenConfig};
pub use export::{export_csv, export_json, export_report_json, import_json, write_artifact};
pub use progress::{LogProgress, NoProgress, ScanProgress};
pub use result::{compare_results, rank_results, ScreenResult, SymbolOutcome};
pub use screener::{ReversalScreener, ScanReport, ScreenError};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn screener_is_send_sync() {
        assert_send::<ReversalScreener>();
        assert_sync::<ReversalScreener>();
    }

    #[test]
    fn screen_result_is_send_sync() {
        assert_send::<ScreenResult>();
        assert_sync::<ScreenResult>();
    }

    #[test]
    fn scan_report_is_send_sync() {
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ScreenConfig>();
        assert_sync::<ScreenConfig>();
        assert_send::<ScanWindow>();
        assert_sync::<ScanWindow>();
    }

    #[test]
    fn symbol_outcome_is_send_sync() {
        assert_send::<SymbolOutcome>();
        assert_sync::<SymbolOutcome>();
    }
}
