//! Refresh cycle orchestration and the in-memory quote cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use tickwatch_warehouse::{SnapshotRecord, Warehouse};

use crate::domain::{
    validate_currency_code, CalendarDate, QuoteSnapshot, QuoteWithTrend, Symbol, TrendSequence,
    UtcDateTime, DEFAULT_CURRENCY,
};
use crate::error::CoreError;
use crate::provider::QuoteProvider;
use crate::trend;

/// Tunables for the refresh cycle.
#[derive(Debug, Clone, Copy)]
pub struct RefreshConfig {
    /// Upper bound on provider calls in flight at once.
    pub max_concurrency: usize,
    /// Delay between cycles in watch mode.
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            interval: Duration::from_secs(60),
        }
    }
}

/// Immutable view of the latest completed refresh cycle.
///
/// A symbol maps to `None` when its most recent refresh failed; the failure
/// message is kept alongside in `errors`. A symbol absent from `entries` has
/// never been part of a refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheSnapshot {
    pub entries: BTreeMap<Symbol, Option<QuoteWithTrend>>,
    pub errors: BTreeMap<Symbol, String>,
    pub refreshed_at: Option<UtcDateTime>,
}

impl CacheSnapshot {
    /// True when every requested symbol refreshed cleanly.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Coordinates provider fetches, warehouse writes, and the cache swap.
///
/// Refresh cycles are serialized through an internal gate; readers keep
/// whatever `Arc<CacheSnapshot>` they hold and are never blocked by an
/// in-flight cycle.
pub struct RefreshEngine {
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
    config: RefreshConfig,
    cache: RwLock<Arc<CacheSnapshot>>,
    refresh_gate: Mutex<()>,
    limiter: Arc<Semaphore>,
}

impl RefreshEngine {
    pub fn new(provider: Arc<dyn QuoteProvider>, warehouse: Warehouse, config: RefreshConfig) -> Self {
        let permits = config.max_concurrency.max(1);
        Self {
            provider,
            warehouse,
            config,
            cache: RwLock::new(Arc::new(CacheSnapshot::default())),
            refresh_gate: Mutex::new(()),
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn config(&self) -> RefreshConfig {
        self.config
    }

    /// Current cache view. Cheap to call; clones only the outer `Arc`.
    pub async fn cache(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&*self.cache.read().await)
    }

    /// Run one refresh cycle over the given symbols.
    ///
    /// Each symbol is fetched, anchored, and appended independently; a
    /// failing symbol lands in the cache as `None` with its error recorded
    /// and never aborts the cycle. The cache is replaced wholesale at the
    /// end, so readers see either the previous cycle or this one, never a
    /// mix.
    pub async fn refresh_all(&self, symbols: &[Symbol]) -> Result<Arc<CacheSnapshot>, CoreError> {
        let _gate = self.refresh_gate.lock().await;
        let refreshed_at = UtcDateTime::now();
        info!(symbols = symbols.len(), "starting refresh cycle");

        let mut join_set = JoinSet::new();
        for symbol in symbols {
            let provider = Arc::clone(&self.provider);
            let warehouse = self.warehouse.clone();
            let limiter = Arc::clone(&self.limiter);
            let symbol = symbol.clone();
            join_set.spawn(async move {
                let _permit = limiter
                    .acquire_owned()
                    .await
                    .expect("refresh semaphore is never closed");
                let outcome =
                    refresh_symbol(provider.as_ref(), &warehouse, &symbol, refreshed_at).await;
                (symbol, outcome)
            });
        }

        let mut entries = BTreeMap::new();
        let mut errors = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (symbol, outcome) = joined.map_err(|e| CoreError::Task(e.to_string()))?;
            match outcome {
                Ok(entry) => {
                    debug!(symbol = %symbol, price = entry.quote.price, "symbol refreshed");
                    entries.insert(symbol, Some(entry));
                }
                Err(message) => {
                    warn!(symbol = %symbol, error = %message, "symbol refresh failed");
                    entries.insert(symbol.clone(), None);
                    errors.insert(symbol, message);
                }
            }
        }

        let snapshot = Arc::new(CacheSnapshot {
            entries,
            errors,
            refreshed_at: Some(refreshed_at),
        });
        *self.cache.write().await = Arc::clone(&snapshot);
        info!(
            ok = snapshot.entries.len() - snapshot.errors.len(),
            failed = snapshot.errors.len(),
            "refresh cycle complete"
        );
        Ok(snapshot)
    }

    /// Timestamp of the last completed cycle, if any ran.
    pub async fn last_refreshed(&self) -> Option<UtcDateTime> {
        self.cache.read().await.refreshed_at
    }

    /// Directional runs over one symbol's stored snapshot history.
    ///
    /// With no date the full history is segmented, so a run can span day
    /// boundaries; passing a date restricts segmentation to that day.
    pub fn trend_sequences(
        &self,
        symbol: &Symbol,
        date: Option<CalendarDate>,
    ) -> Result<Vec<TrendSequence>, CoreError> {
        let records = match date {
            Some(date) => self
                .warehouse
                .snapshots_for_day(symbol.as_str(), &date.to_string())?,
            None => {
                // Stored newest-first; segmentation wants oldest-first.
                let mut records = self.warehouse.snapshots_for_symbol(symbol.as_str())?;
                records.reverse();
                records
            }
        };

        let mut history = Vec::with_capacity(records.len());
        for record in records {
            history.push(snapshot_from_record(symbol, &record)?);
        }
        Ok(trend::segment(&history))
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }
}

fn snapshot_from_record(
    symbol: &Symbol,
    record: &SnapshotRecord,
) -> Result<QuoteSnapshot, CoreError> {
    let refreshed_at = UtcDateTime::parse(&record.refreshed_at)?;
    let snapshot = QuoteSnapshot::new(
        symbol.clone(),
        record.price,
        &record.currency,
        record.change,
        record.change_percent,
        refreshed_at,
    )?;
    Ok(snapshot)
}

async fn refresh_symbol(
    provider: &dyn QuoteProvider,
    warehouse: &Warehouse,
    symbol: &Symbol,
    refreshed_at: UtcDateTime,
) -> Result<QuoteWithTrend, String> {
    let raw = provider
        .quote(symbol)
        .await
        .map_err(|error| error.to_string())?;

    let currency = resolve_currency(warehouse, symbol, raw.currency.as_deref())
        .map_err(|error| error.to_string())?;

    let snapshot = QuoteSnapshot::new(
        symbol.clone(),
        raw.price,
        &currency,
        raw.change,
        raw.change_percent,
        refreshed_at,
    )
    .map_err(|error| error.to_string())?;

    let date = refreshed_at.date().to_string();
    let day_open = warehouse
        .ensure_day_open(symbol.as_str(), &date, snapshot.price, &currency)
        .map_err(|error| error.to_string())?;

    warehouse
        .append_snapshot(&SnapshotRecord {
            symbol: symbol.as_str().to_owned(),
            refreshed_at: refreshed_at.format_rfc3339(),
            price: snapshot.price,
            currency: currency.clone(),
            change: snapshot.change,
            change_percent: snapshot.change_percent,
        })
        .map_err(|error| error.to_string())?;

    let daily_trend = trend::daily_trend(Some(day_open), snapshot.price);
    Ok(QuoteWithTrend {
        quote: snapshot,
        day_open: Some(day_open),
        daily_trend,
    })
}

/// Pick the currency for a fresh snapshot: the provider's value when it is a
/// usable ISO code, otherwise the last one stored for the symbol, otherwise
/// the default.
fn resolve_currency(
    warehouse: &Warehouse,
    symbol: &Symbol,
    provided: Option<&str>,
) -> Result<String, CoreError> {
    if let Some(raw) = provided {
        let normalized = raw.trim().to_ascii_uppercase();
        if let Ok(currency) = validate_currency_code(&normalized) {
            return Ok(currency);
        }
        warn!(symbol = %symbol, currency = raw, "ignoring unusable provider currency");
    }

    if let Some(currency) = warehouse.last_known_currency(symbol.as_str())? {
        return Ok(currency);
    }
    Ok(String::from(DEFAULT_CURRENCY))
}
