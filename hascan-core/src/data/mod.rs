//! Price-history providers, response caching and symbol sources

pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use cache::{CacheKey, CachingProvider, DiskCache, FetchCache, MemoryCache};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult};
pub use synthetic::SyntheticProvider;
pub use universe::{SymbolSet, Universe};
pub use yahoo::YahooProvider;
