//! HASCAN Core: domain types, Heikin Ashi transform, reversal pattern, data providers.
//!
//! This crate contains everything a single-symbol analysis pass needs:
//! - Domain types (raw bars, raw series, smoothed bars and series)
//! - The Heikin Ashi recurrence (one forward sweep per series)
//! - The two-bar reversal predicate
//! - Price-history providers (Yahoo Finance, CSV directory, synthetic)
//! - Explicit response caching with a time-to-live
//! - Symbol sources (built-in list, user text, TOML universes)

pub mod data;
pub mod domain;
pub mod heikin_ashi;
pub mod pattern;

pub use domain::{BarError, RawBar, RawSeries, SmoothedBar, SmoothedSeries};
pub use heikin_ashi::{transform, transform_bars, transform_lenient, TransformError};
pub use pattern::{detect_reversal, is_reversal, ReversalSignal};
