//! Behavior-driven tests for the refresh engine.
//!
//! These tests verify WHAT a refresh cycle produces: the intraday log, the
//! day-open anchor, the cache view, and per-symbol failure isolation.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use tickwatch_core::engine::{RefreshConfig, RefreshEngine};
use tickwatch_core::provider::{ProviderBar, ProviderError, ProviderQuote, QuoteProvider};
use tickwatch_core::{CalendarDate, Symbol, TrendDirection, UtcDateTime};
use tickwatch_warehouse::{SnapshotRecord, Warehouse, WarehouseConfig};

/// Provider scripted per symbol: successive quote calls pop the next price.
struct ScriptedProvider {
    prices: Mutex<BTreeMap<String, VecDeque<f64>>>,
    currency: Option<String>,
    failing: BTreeSet<String>,
}

impl ScriptedProvider {
    fn new(prices: &[(&str, &[f64])]) -> Self {
        Self {
            prices: Mutex::new(
                prices
                    .iter()
                    .map(|(symbol, series)| {
                        ((*symbol).to_owned(), series.iter().copied().collect())
                    })
                    .collect(),
            ),
            currency: Some(String::from("USD")),
            failing: BTreeSet::new(),
        }
    }

    fn without_currency(mut self) -> Self {
        self.currency = None;
        self
    }

    fn failing_on(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_owned());
        self
    }
}

impl QuoteProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderQuote, ProviderError>> + Send + 'a>> {
        let result = if self.failing.contains(symbol.as_str()) {
            Err(ProviderError::unavailable("scripted upstream outage"))
        } else {
            let mut prices = self.prices.lock().expect("price script");
            let series = prices.get_mut(symbol.as_str());
            match series.and_then(|s| if s.len() > 1 { s.pop_front() } else { s.front().copied() })
            {
                Some(price) => Ok(ProviderQuote {
                    symbol: symbol.clone(),
                    price,
                    currency: self.currency.clone(),
                    change: None,
                    change_percent: None,
                    as_of: UtcDateTime::now(),
                }),
                None => Err(ProviderError::not_found(symbol)),
            }
        };
        Box::pin(async move { result })
    }

    fn daily_bars<'a>(
        &'a self,
        _symbol: &'a Symbol,
        _lookback_days: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, ProviderError>> + Send + 'a>> {
        Box::pin(async move { Ok(Vec::new()) })
    }
}

fn open_temp_warehouse(dir: &tempfile::TempDir) -> Warehouse {
    Warehouse::open(WarehouseConfig {
        home: dir.path().to_path_buf(),
        db_path: dir.path().join("tickwatch.duckdb"),
        max_pool_size: 2,
    })
    .expect("warehouse open")
}

fn engine_with(provider: ScriptedProvider, warehouse: Warehouse) -> RefreshEngine {
    RefreshEngine::new(Arc::new(provider), warehouse, RefreshConfig::default())
}

fn symbol(s: &str) -> Symbol {
    Symbol::parse(s).expect("valid symbol")
}

// =============================================================================
// Refresh cycle: storage and cache effects
// =============================================================================

#[tokio::test]
async fn cache_starts_empty_before_any_refresh() {
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(
        ScriptedProvider::new(&[("AAPL", &[100.0])]),
        open_temp_warehouse(&temp),
    );

    let cache = engine.cache().await;
    assert!(cache.entries.is_empty());
    assert!(cache.refreshed_at.is_none());
    assert!(engine.last_refreshed().await.is_none());
}

#[tokio::test]
async fn first_refresh_of_the_day_anchors_the_open_and_reports_flat_trend() {
    // Given: a fresh warehouse and a provider quoting 100.0
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);
    let engine = engine_with(ScriptedProvider::new(&[("AAPL", &[100.0])]), warehouse.clone());

    // When: one refresh cycle runs
    let cache = engine
        .refresh_all(&[symbol("AAPL")])
        .await
        .expect("cycle should succeed");

    // Then: the cache holds the quote with a zero same-day trend
    let entry = cache.entries[&symbol("AAPL")]
        .as_ref()
        .expect("entry should be present");
    assert_eq!(entry.quote.price, 100.0);
    assert_eq!(entry.day_open, Some(100.0));
    assert_eq!(entry.daily_trend, Some(0.0));
    assert_eq!(entry.quote.change, None, "unreported change is not coerced");

    // And: the log holds the midnight anchor plus the observation
    let date = CalendarDate::today_utc().to_string();
    let open = warehouse
        .day_open_price("AAPL", &date)
        .expect("day open lookup");
    assert_eq!(open, Some(100.0));
    let rows = warehouse.snapshots_for_day("AAPL", &date).expect("rows");
    assert_eq!(rows.len(), 2);
    assert!(rows[0].refreshed_at.ends_with("T00:00:00Z"));
}

#[tokio::test]
async fn later_refreshes_keep_the_first_anchor_and_trend_against_it() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);
    let engine = engine_with(
        ScriptedProvider::new(&[("AAPL", &[100.0, 105.0])]),
        warehouse.clone(),
    );
    let watchlist = [symbol("AAPL")];

    engine.refresh_all(&watchlist).await.expect("first cycle");
    // Snapshots are keyed at second precision; space the cycles out.
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let cache = engine.refresh_all(&watchlist).await.expect("second cycle");

    let entry = cache.entries[&symbol("AAPL")]
        .as_ref()
        .expect("entry present");
    assert_eq!(entry.quote.price, 105.0);
    assert_eq!(entry.day_open, Some(100.0), "anchor keeps the first price");
    let trend = entry.daily_trend.expect("trend");
    assert!((trend - 5.0).abs() < 1e-9);

    let date = CalendarDate::today_utc().to_string();
    let rows = warehouse.snapshots_for_day("AAPL", &date).expect("rows");
    assert_eq!(rows.len(), 3, "anchor plus two observations");
}

// =============================================================================
// Failure isolation
// =============================================================================

#[tokio::test]
async fn one_failing_symbol_never_aborts_the_cycle() {
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(
        ScriptedProvider::new(&[("AAPL", &[100.0]), ("MSFT", &[400.0])]).failing_on("MSFT"),
        open_temp_warehouse(&temp),
    );

    let cache = engine
        .refresh_all(&[symbol("AAPL"), symbol("MSFT")])
        .await
        .expect("cycle should still succeed");

    assert!(cache.entries[&symbol("AAPL")].is_some());
    assert!(cache.entries[&symbol("MSFT")].is_none());
    assert!(!cache.is_complete());
    let message = &cache.errors[&symbol("MSFT")];
    assert!(message.contains("outage"), "failure reason is recorded: {message}");
}

#[tokio::test]
async fn unknown_symbol_lands_as_null_entry_with_not_found_error() {
    let temp = tempdir().expect("tempdir");
    let engine = engine_with(
        ScriptedProvider::new(&[("AAPL", &[100.0])]),
        open_temp_warehouse(&temp),
    );

    let cache = engine
        .refresh_all(&[symbol("NOPE")])
        .await
        .expect("cycle should succeed");

    assert!(cache.entries[&symbol("NOPE")].is_none());
    assert!(cache.errors[&symbol("NOPE")].contains("not_found"));
}

// =============================================================================
// Currency fallback
// =============================================================================

#[tokio::test]
async fn silent_provider_currency_falls_back_to_last_known_then_default() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);

    // SAP has a stored EUR bar; AAPL has nothing.
    warehouse
        .upsert_daily_bars(&[tickwatch_warehouse::DailyBarRecord {
            symbol: String::from("SAP"),
            bar_date: String::from("2026-02-19"),
            open_price: 180.0,
            close_price: 181.0,
            currency: String::from("EUR"),
            day_change_percent: 0.56,
            volume: None,
        }])
        .expect("seed bar");

    let engine = engine_with(
        ScriptedProvider::new(&[("SAP", &[182.0]), ("AAPL", &[100.0])]).without_currency(),
        warehouse,
    );

    let cache = engine
        .refresh_all(&[symbol("SAP"), symbol("AAPL")])
        .await
        .expect("cycle");

    let sap = cache.entries[&symbol("SAP")].as_ref().expect("entry");
    assert_eq!(sap.quote.currency, "EUR");
    let aapl = cache.entries[&symbol("AAPL")].as_ref().expect("entry");
    assert_eq!(aapl.quote.currency, "USD");
}

// =============================================================================
// Trend segmentation over stored history
// =============================================================================

#[tokio::test]
async fn stored_day_segments_into_directional_runs_with_shared_boundaries() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);

    // Given: a day of history 100 -> 105 -> 103 -> 108
    let prices = [
        ("2026-02-20T10:00:00Z", 100.0),
        ("2026-02-20T10:05:00Z", 105.0),
        ("2026-02-20T10:10:00Z", 103.0),
        ("2026-02-20T10:15:00Z", 108.0),
    ];
    for (at, price) in prices {
        warehouse
            .append_snapshot(&SnapshotRecord {
                symbol: String::from("AAPL"),
                refreshed_at: at.to_owned(),
                price,
                currency: String::from("USD"),
                change: None,
                change_percent: None,
            })
            .expect("seed snapshot");
    }

    let engine = engine_with(ScriptedProvider::new(&[]), warehouse);
    let runs = engine
        .trend_sequences(
            &symbol("AAPL"),
            Some(CalendarDate::parse("2026-02-20").expect("date")),
        )
        .expect("segmentation");

    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0].direction, TrendDirection::Up);
    assert!((runs[0].change_percent - 5.0).abs() < 1e-9);
    assert_eq!(runs[0].currency, "USD");
    assert_eq!(runs[1].direction, TrendDirection::Down);
    assert_eq!(runs[2].direction, TrendDirection::Up);
    assert_eq!(runs[0].end_time, runs[1].start_time);
    assert_eq!(runs[1].end_time, runs[2].start_time);
    assert_eq!(runs.iter().map(|r| r.snapshot_count).sum::<usize>(), 6);
}

#[tokio::test]
async fn full_history_runs_cross_day_boundaries() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);

    // An overnight climb: the last quote of day one, two quotes the next day.
    let prices = [
        ("2026-02-19T21:00:00Z", 99.0),
        ("2026-02-20T14:30:00Z", 101.0),
        ("2026-02-20T15:00:00Z", 104.0),
    ];
    for (at, price) in prices {
        warehouse
            .append_snapshot(&SnapshotRecord {
                symbol: String::from("AAPL"),
                refreshed_at: at.to_owned(),
                price,
                currency: String::from("USD"),
                change: None,
                change_percent: None,
            })
            .expect("seed snapshot");
    }

    let engine = engine_with(ScriptedProvider::new(&[]), warehouse);

    let runs = engine
        .trend_sequences(&symbol("AAPL"), None)
        .expect("segmentation");
    assert_eq!(runs.len(), 1, "one run spans the overnight gap");
    assert_eq!(runs[0].direction, TrendDirection::Up);
    assert_eq!(runs[0].snapshot_count, 3);
    assert_eq!(runs[0].start_time.to_string(), "2026-02-19T21:00:00Z");
    assert_eq!(runs[0].end_time.to_string(), "2026-02-20T15:00:00Z");

    // The day filter still narrows to one calendar day.
    let day_runs = engine
        .trend_sequences(
            &symbol("AAPL"),
            Some(CalendarDate::parse("2026-02-20").expect("date")),
        )
        .expect("segmentation");
    assert_eq!(day_runs.len(), 1);
    assert_eq!(day_runs[0].snapshot_count, 2);
    assert_eq!(day_runs[0].start_time.to_string(), "2026-02-20T14:30:00Z");
}

#[tokio::test]
async fn fewer_than_two_snapshots_yield_no_trend_runs() {
    let temp = tempdir().expect("tempdir");
    let warehouse = open_temp_warehouse(&temp);
    warehouse
        .append_snapshot(&SnapshotRecord {
            symbol: String::from("AAPL"),
            refreshed_at: String::from("2026-02-20T10:00:00Z"),
            price: 100.0,
            currency: String::from("USD"),
            change: None,
            change_percent: None,
        })
        .expect("seed snapshot");

    let engine = engine_with(ScriptedProvider::new(&[]), warehouse);
    let runs = engine
        .trend_sequences(
            &symbol("AAPL"),
            Some(CalendarDate::parse("2026-02-20").expect("date")),
        )
        .expect("segmentation");
    assert!(runs.is_empty());
}
