use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::domain::{CalendarDate, Symbol, UtcDateTime};

/// Provider-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    NotFound,
    Unavailable,
    RateLimited,
    InvalidRequest,
}

/// Structured provider error carried through refresh and backfill reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn not_found(symbol: &Symbol) -> Self {
        Self {
            kind: ProviderErrorKind::NotFound,
            message: format!("symbol '{symbol}' is not known to the provider"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    /// A response we could fetch but not interpret. Retrying would fetch the
    /// same payload, so this is not retryable.
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::NotFound => "provider.not_found",
            ProviderErrorKind::Unavailable => "provider.unavailable",
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Raw quote as reported by a provider, before warehouse normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuote {
    pub symbol: Symbol,
    pub price: f64,
    /// Some providers omit currency; the engine falls back to the last known
    /// one for the symbol.
    pub currency: Option<String>,
    /// Absent when the provider reports no previous close to compare against.
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub as_of: UtcDateTime,
}

/// Raw daily bar as reported by a provider.
///
/// Open and close may be absent on half-days or for delisted ranges; the
/// backfill reconciler skips such bars.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderBar {
    pub date: CalendarDate,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    pub currency: Option<String>,
}

type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Quote provider contract.
///
/// Implementations fetch live data; tests script responses inline.
pub trait QuoteProvider: Send + Sync {
    /// Provider name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Current quote for one symbol.
    fn quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, ProviderQuote>;

    /// Daily bars covering the last `lookback_days` calendar days, oldest
    /// first. May return fewer bars than days (weekends, holidays).
    fn daily_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        lookback_days: u32,
    ) -> ProviderFuture<'a, Vec<ProviderBar>>;
}
