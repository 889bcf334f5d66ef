//! HASCAN CLI: Heikin Ashi reversal screening from the terminal.
//!
//! Commands:
//! - `scan`: screen a symbol set and print the ranked reversals
//! - `symbols`: list the built-in (or a universe file's) symbol lists
//! - `show`: print the recent smoothed candles for one symbol
//! - `cache purge`: delete expired entries from the on-disk response cache

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hascan_core::data::{
    CachingProvider, CircuitBreaker, CsvProvider, DataProvider, DiskCache, MemoryCache,
    SymbolSet, SyntheticProvider, Universe, YahooProvider,
};
use hascan_core::heikin_ashi::transform_lenient;
use hascan_core::SmoothedBar;
use hascan_runner::{
    export_csv, export_json, write_artifact, LogProgress, ReversalScreener, ScanReport,
    ScreenConfig,
};

#[derive(Parser)]
#[command(
    name = "hascan",
    about = "HASCAN: Heikin Ashi bullish-reversal screener"
)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen symbols for a bearish-to-bullish Heikin Ashi flip.
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        selection: SymbolArgs,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Write ranked results (with smoothed series) as JSON.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write ranked results as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List built-in or universe-file symbol lists.
    Symbols {
        /// Universe TOML file (`[lists] name = [..]`).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Only print this list.
        #[arg(long)]
        list: Option<String>,
    },
    /// Print the most recent smoothed candles for one symbol.
    Show {
        /// Symbol to show (e.g., ENI.MI).
        symbol: String,

        /// Number of candles to print.
        #[arg(long, default_value_t = 30)]
        bars: usize,

        /// Calendar days of history to fetch.
        #[arg(long, default_value_t = 60)]
        days: u32,

        /// Reference date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<NaiveDate>,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Response cache management.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove cached responses older than the TTL.
    Purge {
        /// Cache directory.
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        /// TTL in seconds.
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },
}

/// Where price history comes from.
#[derive(Args)]
struct SourceArgs {
    /// Read `{SYMBOL}.csv` files from this directory instead of Yahoo Finance.
    #[arg(long, conflicts_with = "synthetic")]
    csv_dir: Option<PathBuf>,

    /// Use a seeded random walk instead of real data.
    #[arg(long)]
    synthetic: Option<u64>,

    /// Cache responses on disk in this directory (in memory otherwise).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Disable response caching.
    #[arg(long, default_value_t = false, conflicts_with = "cache_dir")]
    no_cache: bool,
}

/// Which symbols to scan. Defaults to the built-in FTSE MIB list.
#[derive(Args)]
struct SymbolArgs {
    /// Comma-separated symbols.
    #[arg(long, value_delimiter = ',')]
    symbols: Vec<String>,

    /// Text file with one symbol per line (commas also accepted).
    #[arg(long)]
    symbols_file: Option<PathBuf>,

    /// Universe TOML file; use with --list.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// List name inside the universe file.
    #[arg(long, requires = "universe")]
    list: Option<String>,
}

/// Overrides for `ScreenConfig` values.
#[derive(Args)]
struct TuningArgs {
    /// Screen config TOML file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    lookback_days: Option<u32>,

    /// Worker threads.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-symbol fetch timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    as_of: Option<NaiveDate>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan {
            source,
            selection,
            tuning,
            json,
            csv,
        } => run_scan(&source, &selection, &tuning, json.as_deref(), csv.as_deref()),
        Commands::Symbols { universe, list } => run_symbols(universe.as_deref(), list.as_deref()),
        Commands::Show {
            symbol,
            bars,
            days,
            as_of,
            source,
        } => run_show(&symbol, bars, days, as_of, &source),
        Commands::Cache { action } => match action {
            CacheAction::Purge { cache_dir, ttl } => run_cache_purge(&cache_dir, ttl),
        },
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn run_scan(
    source: &SourceArgs,
    selection: &SymbolArgs,
    tuning: &TuningArgs,
    json_path: Option<&Path>,
    csv_path: Option<&Path>,
) -> Result<()> {
    let config = build_config(tuning)?;
    let symbols = resolve_symbols(selection)?;
    let provider = build_provider(source, &config)?;

    let screener = ReversalScreener::new(provider, config);
    let cancel = cancel_on_interrupt();
    let report = screener.scan(&symbols, &LogProgress, Some(cancel.as_ref()))?;

    print_report(&report);

    if let Some(path) = json_path {
        write_artifact(path, &export_json(&report.results)?)?;
        println!("JSON written to: {}", path.display());
    }
    if let Some(path) = csv_path {
        write_artifact(path, &export_csv(&report.results)?)?;
        println!("CSV written to: {}", path.display());
    }
    Ok(())
}

/// First Ctrl-C cancels the scan cooperatively; a second one exits.
fn cancel_on_interrupt() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let installed = ctrlc::set_handler(move || {
        if request_cancel(&flag) {
            std::process::exit(130);
        }
        tracing::warn!("interrupt received, finishing in-flight symbols (Ctrl-C again to quit)");
    });
    if let Err(e) = installed {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
    cancel
}

/// Set the cancel flag. Returns true if it was already set.
fn request_cancel(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::SeqCst)
}

fn build_config(tuning: &TuningArgs) -> Result<ScreenConfig> {
    let mut config = match &tuning.config {
        Some(path) => ScreenConfig::from_file(path)?,
        None => ScreenConfig::default(),
    };
    if let Some(days) = tuning.lookback_days {
        config.lookback_days = days;
    }
    if let Some(n) = tuning.concurrency {
        config.concurrency = n;
    }
    if let Some(secs) = tuning.timeout {
        config.fetch_timeout_secs = secs;
    }
    if tuning.as_of.is_some() {
        config.as_of = tuning.as_of;
    }
    if let Err(msg) = config.validate() {
        bail!("invalid settings: {msg}");
    }
    Ok(config)
}

fn resolve_symbols(selection: &SymbolArgs) -> Result<SymbolSet> {
    let set = if !selection.symbols.is_empty() {
        SymbolSet::from_symbols(&selection.symbols)
    } else if let Some(path) = &selection.symbols_file {
        SymbolSet::from_file(path).map_err(anyhow::Error::msg)?
    } else if let Some(path) = &selection.universe {
        let universe = Universe::from_file(path).map_err(anyhow::Error::msg)?;
        match &selection.list {
            Some(name) => universe.symbol_set(name).with_context(|| {
                format!(
                    "no list '{name}' in {}. Available: {}",
                    path.display(),
                    universe.list_names().join(", ")
                )
            })?,
            None => universe.all_symbols(),
        }
    } else {
        SymbolSet::default_set()
    };

    if set.is_empty() {
        bail!("no symbols to scan");
    }
    Ok(set)
}

fn build_provider(source: &SourceArgs, config: &ScreenConfig) -> Result<Arc<dyn DataProvider>> {
    let base: Arc<dyn DataProvider> = if let Some(dir) = &source.csv_dir {
        let provider = CsvProvider::new(dir);
        if !provider.is_available() {
            bail!("CSV directory does not exist: {}", dir.display());
        }
        Arc::new(provider)
    } else if let Some(seed) = source.synthetic {
        tracing::warn!(seed, "using SYNTHETIC data");
        Arc::new(SyntheticProvider::new(seed))
    } else {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Arc::new(YahooProvider::with_timeout(breaker, config.fetch_timeout())?)
    };

    if source.no_cache {
        return Ok(base);
    }
    let provider: Arc<dyn DataProvider> = match &source.cache_dir {
        Some(dir) => {
            let cache = DiskCache::new(dir, config.cache_ttl())?;
            Arc::new(CachingProvider::new(base, Arc::new(cache)))
        }
        None => Arc::new(CachingProvider::new(
            base,
            Arc::new(MemoryCache::new(config.cache_ttl())),
        )),
    };
    Ok(provider)
}

fn run_symbols(universe: Option<&Path>, list: Option<&str>) -> Result<()> {
    let universe = match universe {
        Some(path) => Universe::from_file(path).map_err(anyhow::Error::msg)?,
        None => Universe::builtin(),
    };

    let names: Vec<&str> = match list {
        Some(name) => vec![name],
        None => universe.list_names(),
    };
    for name in names {
        let set = universe
            .symbol_set(name)
            .with_context(|| format!("no list named '{name}'"))?;
        println!("{name} ({} symbols)", set.len());
        for symbol in set.iter() {
            println!("  {symbol}");
        }
    }
    Ok(())
}

fn run_show(
    symbol: &str,
    bars: usize,
    days: u32,
    as_of: Option<NaiveDate>,
    source: &SourceArgs,
) -> Result<()> {
    let config = ScreenConfig {
        lookback_days: days,
        as_of,
        ..ScreenConfig::default()
    };
    if let Err(msg) = config.validate() {
        bail!("invalid settings: {msg}");
    }
    let provider = build_provider(source, &config)?;
    let symbol = symbol.trim().to_uppercase();
    let window = config.window();

    let fetched = provider.fetch(&symbol, window.start, window.end)?;
    if fetched.is_empty() {
        bail!("no data for {symbol} between {} and {}", window.start, window.end);
    }
    let lenient = transform_lenient(fetched.bars, 1)
        .with_context(|| format!("no usable bars for {symbol}"))?;

    println!();
    println!("=== {symbol} Heikin Ashi ===");
    if lenient.dropped > 0 {
        println!("({} unusable bars dropped)", lenient.dropped);
    }
    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}  ",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    println!("{}", "-".repeat(72));
    for bar in lenient.smoothed.tail(bars) {
        print_candle(bar);
    }
    println!();
    Ok(())
}

fn print_candle(bar: &SmoothedBar) {
    let marker = if bar.is_bullish() {
        "▲"
    } else if bar.is_bearish() {
        "▼"
    } else {
        "-"
    };
    let volume = bar
        .volume
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>12}  {marker}",
        bar.date, bar.open, bar.high, bar.low, bar.close, volume
    );
}

fn run_cache_purge(cache_dir: &Path, ttl: u64) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }
    let cache = DiskCache::new(cache_dir, Duration::from_secs(ttl))?;
    let removed = cache.purge_expired()?;
    println!("Removed {removed} expired response(s) from {}", cache_dir.display());
    Ok(())
}

fn print_report(report: &ScanReport) {
    println!();
    println!("=== Heikin Ashi Reversals ===");
    println!(
        "Window:         {} to {}",
        report.window.start, report.window.end
    );
    println!(
        "Scanned:        {} ({} matched, {} no match, {} skipped)",
        report.scanned,
        report.matched,
        report.no_match(),
        report.skipped
    );
    println!("Elapsed:        {:.1}s", report.elapsed_secs);
    println!("Data hash:      {}", &report.data_fingerprint[..16]);
    if report.cancelled {
        println!("WARNING: scan was cancelled; results are partial");
    }
    println!();

    if report.results.is_empty() {
        println!("No bullish reversals found.");
        println!();
        return;
    }

    println!(
        "{:>4}  {:<12} {:<12} {:>9} {:>12}",
        "Rank", "Symbol", "Signal", "Change", "HA Close"
    );
    println!("{}", "-".repeat(53));
    for (i, r) in report.results.iter().enumerate() {
        println!(
            "{:>4}  {:<12} {:<12} {:>8.2}% {:>12.4}",
            i + 1,
            r.symbol,
            r.signal_date,
            r.pct_change,
            r.yesterday.close
        );
    }
    println!();
}
