//! CLI argument definitions for tickwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `refresh` | Run one refresh cycle over a watchlist |
//! | `watch` | Refresh a watchlist on an interval until Ctrl-C |
//! | `backfill` | Reconcile daily-bar history |
//! | `history` | Print stored snapshots for a symbol |
//! | `bars` | Print stored daily bars for a symbol |
//! | `trends` | Print trend runs over a symbol's stored history |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--db-path` | `$TICKWATCH_HOME/tickwatch.duckdb` | Database file |
//! | `--mock` | `false` | Deterministic offline provider |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Quote ingestion, caching, and trend analysis for tracked symbols.
///
/// Quotes flow into an append-only intraday log in a local DuckDB file;
/// trend math and daily-bar history are read back from the same file.
#[derive(Debug, Parser)]
#[command(
    name = "tickwatch",
    author,
    version,
    about = "Watchlist quote engine with intraday trend analysis"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Path to the DuckDB database file.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Use the deterministic offline provider instead of the network.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one refresh cycle and print the resulting cache view.
    ///
    /// # Examples
    ///
    ///   tickwatch refresh AAPL MSFT --pretty
    Refresh(RefreshArgs),

    /// Refresh a watchlist on an interval until interrupted.
    ///
    /// # Examples
    ///
    ///   tickwatch watch AAPL MSFT --interval-secs 30
    Watch(WatchArgs),

    /// Reconcile daily-bar history for a watchlist and print the report.
    ///
    /// # Examples
    ///
    ///   tickwatch backfill AAPL --days 90
    Backfill(BackfillArgs),

    /// Print stored intraday snapshots for a symbol, newest first.
    History(HistoryArgs),

    /// Print stored daily bars for a symbol, newest first.
    Bars(BarsArgs),

    /// Print directional trend runs over a symbol's stored history.
    ///
    /// # Examples
    ///
    ///   tickwatch trends AAPL
    ///   tickwatch trends AAPL --date 2026-02-20
    Trends(TrendsArgs),
}

/// Arguments for the `refresh` command.
#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// One or more market symbols (e.g., AAPL, MSFT, BRK.B).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,
}

/// Arguments for the `watch` command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// One or more market symbols.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    /// Seconds between refresh cycles.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Provider calls in flight at once.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,
}

/// Arguments for the `backfill` command.
#[derive(Debug, Args)]
pub struct BackfillArgs {
    /// One or more market symbols.
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    /// Calendar days of history to request.
    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

/// Arguments for the `history` command.
#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Market symbol.
    pub symbol: String,
}

/// Arguments for the `bars` command.
#[derive(Debug, Args)]
pub struct BarsArgs {
    /// Market symbol.
    pub symbol: String,
}

/// Arguments for the `trends` command.
#[derive(Debug, Args)]
pub struct TrendsArgs {
    /// Market symbol.
    pub symbol: String,

    /// Restrict segmentation to one day as YYYY-MM-DD. Without it the full
    /// stored history is segmented, so runs may span day boundaries.
    #[arg(long)]
    pub date: Option<String>,
}
