//! Domain types for HASCAN

pub mod bar;
pub mod smoothed;

pub use bar::{BarError, Canonicalized, RawBar, RawSeries};
pub use smoothed::{SmoothedBar, SmoothedSeries};
