//! Daily-bar history reconciliation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use tickwatch_warehouse::{DailyBarRecord, Warehouse};

use crate::domain::{validate_currency_code, DailyBar, Symbol, DEFAULT_CURRENCY};
use crate::error::{CoreError, ValidationError};
use crate::provider::{ProviderBar, QuoteProvider};

/// Outcome of one backfill run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackfillReport {
    pub total_bars_written: usize,
    pub per_symbol: BTreeMap<Symbol, usize>,
    pub errors: BTreeMap<Symbol, String>,
}

impl BackfillReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Pulls provider history and replace-writes daily bars per symbol.
///
/// Symbols are processed one at a time; each symbol's bars commit in a
/// single transaction, and a failing symbol is recorded in the report
/// without stopping the run.
pub struct BackfillReconciler {
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
}

impl BackfillReconciler {
    pub fn new(provider: Arc<dyn QuoteProvider>, warehouse: Warehouse) -> Self {
        Self {
            provider,
            warehouse,
        }
    }

    pub async fn run(
        &self,
        symbols: &[Symbol],
        lookback_days: u32,
    ) -> Result<BackfillReport, CoreError> {
        if lookback_days == 0 {
            return Err(ValidationError::ZeroLookback.into());
        }

        let mut report = BackfillReport::default();
        for symbol in symbols {
            match self.reconcile_symbol(symbol, lookback_days).await {
                Ok(written) => {
                    report.total_bars_written += written;
                    report.per_symbol.insert(symbol.clone(), written);
                }
                Err(message) => {
                    warn!(symbol = %symbol, error = %message, "backfill failed for symbol");
                    report.errors.insert(symbol.clone(), message);
                }
            }
        }

        info!(
            bars = report.total_bars_written,
            failed = report.errors.len(),
            "backfill run complete"
        );
        Ok(report)
    }

    async fn reconcile_symbol(&self, symbol: &Symbol, lookback_days: u32) -> Result<usize, String> {
        let bars = self
            .provider
            .daily_bars(symbol, lookback_days)
            .await
            .map_err(|error| error.to_string())?;

        let carry_start = self
            .warehouse
            .last_known_currency(symbol.as_str())
            .map_err(|error| error.to_string())?;

        let records = normalize_bars(symbol, bars, carry_start).map_err(|error| error.to_string())?;
        if records.is_empty() {
            return Ok(0);
        }

        self.warehouse
            .upsert_daily_bars(&records)
            .map_err(|error| error.to_string())
    }
}

/// Turn raw provider bars into storable rows.
///
/// Bars without a usable open and close are dropped. Currency carries
/// forward from the last bar that reported one, seeded by what the
/// warehouse already knows for the symbol.
fn normalize_bars(
    symbol: &Symbol,
    mut bars: Vec<ProviderBar>,
    carry_start: Option<String>,
) -> Result<Vec<DailyBarRecord>, ValidationError> {
    bars.sort_by_key(|bar| bar.date);

    let mut carry = carry_start;
    let mut records = Vec::with_capacity(bars.len());
    for bar in bars {
        if let Some(reported) = bar.currency.as_deref() {
            let normalized = reported.trim().to_ascii_uppercase();
            if validate_currency_code(&normalized).is_ok() {
                carry = Some(normalized);
            }
        }

        let (open, close) = match (bar.open, bar.close) {
            (Some(open), Some(close)) if open > 0.0 && close > 0.0 => (open, close),
            _ => {
                debug!(symbol = %symbol, date = %bar.date, "skipping bar without usable open/close");
                continue;
            }
        };

        let currency = carry.clone().unwrap_or_else(|| String::from(DEFAULT_CURRENCY));
        let daily = DailyBar::new(symbol.clone(), bar.date, open, close, &currency, bar.volume)?;
        records.push(DailyBarRecord {
            symbol: daily.symbol.as_str().to_owned(),
            bar_date: daily.date.to_string(),
            open_price: daily.open,
            close_price: daily.close,
            currency: daily.currency,
            day_change_percent: daily.change_percent,
            volume: daily.volume,
        });
    }
    Ok(records)
}
