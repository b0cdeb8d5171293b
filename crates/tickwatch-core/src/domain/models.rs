use serde::{Deserialize, Serialize};

use crate::domain::symbol::Symbol;
use crate::domain::timestamp::{CalendarDate, UtcDateTime};
use crate::ValidationError;

/// Currency assumed when a provider omits one and no prior bar recorded it.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Validate a 3-letter uppercase ISO currency code, e.g. "USD".
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let valid = trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_uppercase());
    if !valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }
    Ok(trimmed.to_owned())
}

fn require_finite(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(value)
}

fn require_non_negative(field: &'static str, value: f64) -> Result<f64, ValidationError> {
    let value = require_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(value)
}

/// A single observed quote for a tracked symbol at a point in time.
///
/// Snapshots are append-only; each refresh cycle adds one row per symbol and
/// the synthetic day-open anchor guarantees at least one row exists for the
/// current day before any trend math runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: Symbol,
    pub price: f64,
    pub currency: String,
    /// Absolute change versus the previous close. `None` when the provider
    /// did not report one.
    pub change: Option<f64>,
    /// Percent change versus the previous close. `None` when the provider
    /// did not report one.
    pub change_percent: Option<f64>,
    pub refreshed_at: UtcDateTime,
}

impl QuoteSnapshot {
    pub fn new(
        symbol: Symbol,
        price: f64,
        currency: &str,
        change: Option<f64>,
        change_percent: Option<f64>,
        refreshed_at: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            symbol,
            price: require_non_negative("price", price)?,
            currency: validate_currency_code(currency)?,
            change: change.map(|v| require_finite("change", v)).transpose()?,
            change_percent: change_percent
                .map(|v| require_finite("change_percent", v))
                .transpose()?,
            refreshed_at,
        })
    }
}

/// Latest quote for a symbol enriched with its intraday trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteWithTrend {
    #[serde(flatten)]
    pub quote: QuoteSnapshot,
    /// First price recorded for the symbol on the current day.
    pub day_open: Option<f64>,
    /// Percent move from the day open to the latest price. `None` when no
    /// usable day-open price exists.
    pub daily_trend: Option<f64>,
}

/// One day of OHLC-style history for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub symbol: Symbol,
    pub date: CalendarDate,
    pub open: f64,
    pub close: f64,
    pub currency: String,
    pub change_percent: f64,
    pub volume: Option<u64>,
}

impl DailyBar {
    pub fn new(
        symbol: Symbol,
        date: CalendarDate,
        open: f64,
        close: f64,
        currency: &str,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        let open = require_non_negative("open", open)?;
        let close = require_non_negative("close", close)?;
        let change_percent = if open > 0.0 {
            (close - open) / open * 100.0
        } else {
            0.0
        };
        Ok(Self {
            symbol,
            date,
            open,
            close,
            currency: validate_currency_code(currency)?,
            change_percent,
            volume,
        })
    }
}

/// Direction of a monotonic run of snapshot prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Maximal run of consecutive snapshots moving in one direction.
///
/// Adjacent sequences share their boundary snapshot, so the end time of one
/// run equals the start time of the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSequence {
    pub direction: TrendDirection,
    pub start_time: UtcDateTime,
    pub end_time: UtcDateTime,
    pub start_price: f64,
    pub end_price: f64,
    /// Currency the run's prices are quoted in, taken from its snapshots.
    pub currency: String,
    pub change_percent: f64,
    pub snapshot_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).expect("test symbol")
    }

    fn ts(s: &str) -> UtcDateTime {
        UtcDateTime::parse(s).expect("test timestamp")
    }

    #[test]
    fn builds_valid_snapshot() {
        let snapshot = QuoteSnapshot::new(
            symbol("AAPL"),
            187.5,
            "USD",
            Some(1.25),
            Some(0.67),
            ts("2026-02-20T15:30:00Z"),
        )
        .expect("snapshot should validate");
        assert_eq!(snapshot.currency, "USD");
        assert_eq!(snapshot.change, Some(1.25));
    }

    #[test]
    fn unreported_change_stays_null_through_serialization() {
        let snapshot = QuoteSnapshot::new(
            symbol("AAPL"),
            187.5,
            "USD",
            None,
            None,
            ts("2026-02-20T15:30:00Z"),
        )
        .expect("snapshot should validate");
        assert_eq!(snapshot.change, None);

        let rendered = serde_json::to_value(&snapshot).expect("serialize");
        assert!(rendered["change"].is_null());
        assert!(rendered["change_percent"].is_null());
    }

    #[test]
    fn rejects_negative_price() {
        let err = QuoteSnapshot::new(
            symbol("AAPL"),
            -1.0,
            "USD",
            None,
            None,
            ts("2026-02-20T15:30:00Z"),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "price" }));
    }

    #[test]
    fn rejects_bad_currency() {
        assert!(validate_currency_code("usd").is_err());
        assert!(validate_currency_code("EURO").is_err());
        assert_eq!(validate_currency_code(" EUR ").expect("valid"), "EUR");
    }

    #[test]
    fn daily_bar_computes_change_percent() {
        let bar = DailyBar::new(
            symbol("MSFT"),
            CalendarDate::parse("2026-02-20").expect("date"),
            100.0,
            104.0,
            "USD",
            Some(1_000),
        )
        .expect("bar should validate");
        assert!((bar.change_percent - 4.0).abs() < 1e-9);
    }

    #[test]
    fn daily_bar_zero_open_has_zero_change() {
        let bar = DailyBar::new(
            symbol("MSFT"),
            CalendarDate::parse("2026-02-20").expect("date"),
            0.0,
            104.0,
            "USD",
            None,
        )
        .expect("bar should validate");
        assert_eq!(bar.change_percent, 0.0);
    }
}
