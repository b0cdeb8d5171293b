pub mod models;
pub mod symbol;
pub mod timestamp;

pub use models::{
    validate_currency_code, DailyBar, QuoteSnapshot, QuoteWithTrend, TrendDirection,
    TrendSequence, DEFAULT_CURRENCY,
};
pub use symbol::Symbol;
pub use timestamp::{CalendarDate, UtcDateTime};
