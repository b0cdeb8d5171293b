//! # Tickwatch Warehouse
//!
//! DuckDB-backed storage for the tickwatch quote engine.
//!
//! Two tables are maintained:
//!
//! | Table | Description |
//! |-------|-------------|
//! | `intraday_snapshots` | Append-only quote observations, one row per (symbol, refreshed_at) |
//! | `daily_bars` | One row per (symbol, calendar date), replaced wholesale on conflict |
//!
//! The intraday log is the source of truth for trend analysis. A synthetic
//! day-open row (timestamped at midnight UTC) anchors the same-day trend and
//! is inserted at most once per symbol and day. Daily bars are written only
//! by the backfill reconciler, one transaction per symbol.
//!
//! All statements are parameterized; user-provided values are never
//! interpolated into SQL.

pub mod duckdb;
mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use thiserror::Error;

pub use duckdb::{ConnectionPool, PooledConnection};

/// Errors surfaced by warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error while preparing the database location.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Location and pooling configuration for the warehouse.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for tickwatch data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let home = resolve_home();
        let db_path = home.join("tickwatch.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Configuration pointing at an explicit database file.
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        let db_path = db_path.into();
        let home = db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// One intraday quote observation.
///
/// `refreshed_at` is RFC3339 UTC with second precision. The synthetic
/// day-open row for a date carries `refreshed_at = <date>T00:00:00Z` and
/// null change fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    pub symbol: String,
    pub refreshed_at: String,
    pub price: f64,
    pub currency: String,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
}

/// One daily bar row, keyed by (symbol, `bar_date`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBarRecord {
    pub symbol: String,
    /// Calendar date as `YYYY-MM-DD`.
    pub bar_date: String,
    pub open_price: f64,
    pub close_price: f64,
    pub currency: String,
    pub day_change_percent: f64,
    pub volume: Option<u64>,
}

/// Handle to the tickwatch database.
#[derive(Clone)]
pub struct Warehouse {
    pool: ConnectionPool,
}

impl Warehouse {
    /// Open the warehouse at the default location (`$TICKWATCH_HOME`).
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open the warehouse, creating the database and schema as needed.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { pool };
        let connection = warehouse.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(warehouse)
    }

    /// Path to the database file.
    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Append one intraday snapshot.
    ///
    /// A second observation landing on the same (symbol, refreshed_at) key
    /// replaces the previous row rather than erroring.
    pub fn append_snapshot(&self, record: &SnapshotRecord) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        let params: [&dyn ToSql; 6] = [
            &record.symbol,
            &record.refreshed_at,
            &record.price,
            &record.currency,
            &record.change,
            &record.change_percent,
        ];
        connection.execute(
            "INSERT OR REPLACE INTO intraday_snapshots \
             (symbol, refreshed_at, price, currency, price_change, price_change_percent) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// Insert the synthetic day-open row for (symbol, date) if none exists.
    ///
    /// Idempotent: later refreshes on the same day leave the existing anchor
    /// untouched. Returns the anchoring open price, which is the previously
    /// stored one when the row already existed.
    pub fn ensure_day_open(
        &self,
        symbol: &str,
        date: &str,
        price: f64,
        currency: &str,
    ) -> Result<f64, WarehouseError> {
        let midnight = day_open_key(date);
        let connection = self.pool.acquire()?;
        let params: [&dyn ToSql; 4] = [&symbol, &midnight, &price, &currency];
        connection.execute(
            "INSERT OR IGNORE INTO intraday_snapshots \
             (symbol, refreshed_at, price, currency, price_change, price_change_percent) \
             VALUES (?, ?, ?, ?, NULL, NULL)",
            params.as_slice(),
        )?;

        let params: [&dyn ToSql; 2] = [&symbol, &midnight];
        let open: f64 = connection.query_row(
            "SELECT price FROM intraday_snapshots WHERE symbol = ? AND refreshed_at = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;
        Ok(open)
    }

    /// Price of the day-open anchor for (symbol, date), if one exists.
    pub fn day_open_price(&self, symbol: &str, date: &str) -> Result<Option<f64>, WarehouseError> {
        let midnight = day_open_key(date);
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT price FROM intraday_snapshots WHERE symbol = ? AND refreshed_at = ?",
        )?;
        let params: [&dyn ToSql; 2] = [&symbol, &midnight];
        let mut rows = statement.query(params.as_slice())?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// All snapshots for a symbol, newest first.
    pub fn snapshots_for_symbol(&self, symbol: &str) -> Result<Vec<SnapshotRecord>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT symbol, refreshed_at, price, currency, price_change, price_change_percent \
             FROM intraday_snapshots WHERE symbol = ? ORDER BY refreshed_at DESC",
        )?;
        let params: [&dyn ToSql; 1] = [&symbol];
        let mut rows = statement.query(params.as_slice())?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(SnapshotRecord {
                symbol: row.get(0)?,
                refreshed_at: row.get(1)?,
                price: row.get(2)?,
                currency: row.get(3)?,
                change: row.get(4)?,
                change_percent: row.get(5)?,
            });
        }
        Ok(records)
    }

    /// Snapshots for one symbol on one calendar day, oldest first.
    ///
    /// Timestamps are fixed-width RFC3339 strings, so a lexicographic range
    /// scan over the day is also a chronological one.
    pub fn snapshots_for_day(
        &self,
        symbol: &str,
        date: &str,
    ) -> Result<Vec<SnapshotRecord>, WarehouseError> {
        let day_start = day_open_key(date);
        let day_end = format!("{date}T23:59:59Z");
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT symbol, refreshed_at, price, currency, price_change, price_change_percent \
             FROM intraday_snapshots \
             WHERE symbol = ? AND refreshed_at >= ? AND refreshed_at <= ? \
             ORDER BY refreshed_at ASC",
        )?;
        let params: [&dyn ToSql; 3] = [&symbol, &day_start, &day_end];
        let mut rows = statement.query(params.as_slice())?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(SnapshotRecord {
                symbol: row.get(0)?,
                refreshed_at: row.get(1)?,
                price: row.get(2)?,
                currency: row.get(3)?,
                change: row.get(4)?,
                change_percent: row.get(5)?,
            });
        }
        Ok(records)
    }

    /// Replace-write a batch of daily bars for one symbol in a single
    /// transaction. Either every bar commits or none does. Returns the
    /// number of rows written.
    pub fn upsert_daily_bars(&self, records: &[DailyBarRecord]) -> Result<usize, WarehouseError> {
        if records.is_empty() {
            return Ok(0);
        }

        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut written = 0;
            for record in records {
                let volume = record.volume.map(|value| value as i64);
                let params: [&dyn ToSql; 7] = [
                    &record.symbol,
                    &record.bar_date,
                    &record.open_price,
                    &record.close_price,
                    &record.currency,
                    &record.day_change_percent,
                    &volume,
                ];
                connection.execute(
                    "INSERT OR REPLACE INTO daily_bars \
                     (symbol, bar_date, open_price, close_price, currency, day_change_percent, volume, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                    params.as_slice(),
                )?;
                written += 1;
            }
            Ok(written)
        })();

        finalize_transaction(&connection, result)
    }

    /// All daily bars for a symbol, newest first.
    pub fn daily_bars_for_symbol(&self, symbol: &str) -> Result<Vec<DailyBarRecord>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT symbol, bar_date, open_price, close_price, currency, day_change_percent, volume \
             FROM daily_bars WHERE symbol = ? ORDER BY bar_date DESC",
        )?;
        let params: [&dyn ToSql; 1] = [&symbol];
        let mut rows = statement.query(params.as_slice())?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let volume: Option<i64> = row.get(6)?;
            records.push(DailyBarRecord {
                symbol: row.get(0)?,
                bar_date: row.get(1)?,
                open_price: row.get(2)?,
                close_price: row.get(3)?,
                currency: row.get(4)?,
                day_change_percent: row.get(5)?,
                volume: volume.and_then(|value| u64::try_from(value).ok()),
            });
        }
        Ok(records)
    }

    /// Currency of the most recent daily bar for a symbol, if any.
    pub fn last_known_currency(&self, symbol: &str) -> Result<Option<String>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT currency FROM daily_bars WHERE symbol = ? ORDER BY bar_date DESC LIMIT 1",
        )?;
        let params: [&dyn ToSql; 1] = [&symbol];
        let mut rows = statement.query(params.as_slice())?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

/// Midnight UTC key marking the synthetic day-open snapshot.
fn day_open_key(date: &str) -> String {
    format!("{date}T00:00:00Z")
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

/// Resolve the tickwatch home directory from environment or default.
fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("TICKWATCH_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".tickwatch");
    }

    PathBuf::from(".tickwatch")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp(dir: &tempfile::TempDir) -> Warehouse {
        Warehouse::open(WarehouseConfig {
            home: dir.path().to_path_buf(),
            db_path: dir.path().join("tickwatch.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    fn snapshot(symbol: &str, at: &str, price: f64) -> SnapshotRecord {
        SnapshotRecord {
            symbol: symbol.to_string(),
            refreshed_at: at.to_string(),
            price,
            currency: String::from("USD"),
            change: None,
            change_percent: None,
        }
    }

    #[test]
    fn snapshots_come_back_newest_first() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        warehouse
            .append_snapshot(&snapshot("AAPL", "2026-02-20T10:00:00Z", 100.0))
            .expect("append");
        warehouse
            .append_snapshot(&snapshot("AAPL", "2026-02-20T11:00:00Z", 101.0))
            .expect("append");
        warehouse
            .append_snapshot(&snapshot("MSFT", "2026-02-20T10:30:00Z", 400.0))
            .expect("append");

        let records = warehouse.snapshots_for_symbol("AAPL").expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].refreshed_at, "2026-02-20T11:00:00Z");
        assert_eq!(records[1].refreshed_at, "2026-02-20T10:00:00Z");
    }

    #[test]
    fn day_open_is_inserted_at_most_once() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let first = warehouse
            .ensure_day_open("AAPL", "2026-02-20", 100.0, "USD")
            .expect("first ensure");
        let second = warehouse
            .ensure_day_open("AAPL", "2026-02-20", 105.0, "USD")
            .expect("second ensure");

        // The anchor keeps the first observed price of the day.
        assert_eq!(first, 100.0);
        assert_eq!(second, 100.0);

        let records = warehouse.snapshots_for_symbol("AAPL").expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].refreshed_at, "2026-02-20T00:00:00Z");
        assert_eq!(records[0].price, 100.0);
    }

    #[test]
    fn day_scoped_snapshots_are_oldest_first_and_exclude_other_days() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        warehouse
            .append_snapshot(&snapshot("AAPL", "2026-02-19T15:00:00Z", 98.0))
            .expect("append");
        warehouse
            .append_snapshot(&snapshot("AAPL", "2026-02-20T11:00:00Z", 101.0))
            .expect("append");
        warehouse
            .append_snapshot(&snapshot("AAPL", "2026-02-20T10:00:00Z", 100.0))
            .expect("append");

        let records = warehouse
            .snapshots_for_day("AAPL", "2026-02-20")
            .expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].refreshed_at, "2026-02-20T10:00:00Z");
        assert_eq!(records[1].refreshed_at, "2026-02-20T11:00:00Z");
    }

    #[test]
    fn day_open_price_is_none_before_any_refresh() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let open = warehouse
            .day_open_price("AAPL", "2026-02-20")
            .expect("lookup");
        assert!(open.is_none());
    }

    #[test]
    fn daily_bar_upsert_replaces_rows_instead_of_duplicating() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        let bar = DailyBarRecord {
            symbol: String::from("AAPL"),
            bar_date: String::from("2026-02-19"),
            open_price: 100.0,
            close_price: 104.0,
            currency: String::from("USD"),
            day_change_percent: 4.0,
            volume: Some(1_000_000),
        };

        let first = warehouse.upsert_daily_bars(&[bar.clone()]).expect("first");
        let second = warehouse.upsert_daily_bars(&[bar.clone()]).expect("second");
        assert_eq!(first, 1);
        assert_eq!(second, 1);

        let bars = warehouse.daily_bars_for_symbol("AAPL").expect("list");
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0], bar);
    }

    #[test]
    fn last_known_currency_reads_most_recent_bar() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_temp(&temp);

        assert!(warehouse
            .last_known_currency("SAP")
            .expect("lookup")
            .is_none());

        let bars = vec![
            DailyBarRecord {
                symbol: String::from("SAP"),
                bar_date: String::from("2026-02-18"),
                open_price: 180.0,
                close_price: 181.0,
                currency: String::from("USD"),
                day_change_percent: 0.56,
                volume: None,
            },
            DailyBarRecord {
                symbol: String::from("SAP"),
                bar_date: String::from("2026-02-19"),
                open_price: 181.0,
                close_price: 182.0,
                currency: String::from("EUR"),
                day_change_percent: 0.55,
                volume: None,
            },
        ];
        warehouse.upsert_daily_bars(&bars).expect("upsert");

        let currency = warehouse.last_known_currency("SAP").expect("lookup");
        assert_eq!(currency.as_deref(), Some("EUR"));
    }
}
