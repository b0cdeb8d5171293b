use std::future::Future;
use std::pin::Pin;

use crate::domain::{CalendarDate, Symbol, UtcDateTime};
use crate::provider::{ProviderBar, ProviderError, ProviderQuote, QuoteProvider};

/// Deterministic offline provider for demos and tests.
///
/// Prices are derived from a symbol hash, so repeated runs for the same
/// watchlist produce the same data without any network access.
#[derive(Debug, Default)]
pub struct MockProvider;

impl MockProvider {
    fn base_price(symbol: &Symbol) -> f64 {
        92.0 + (symbol_seed(symbol) % 500) as f64 / 10.0
    }
}

impl QuoteProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderQuote, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let seed = symbol_seed(symbol);
            let base = Self::base_price(symbol);
            // Small intra-run wobble keyed off the current minute so repeated
            // refreshes within a watch session still move.
            let minute = UtcDateTime::now().unix_timestamp() / 60;
            let wobble = ((seed as i64 + minute) % 21 - 10) as f64 / 20.0;
            let price = base + wobble;
            let change = wobble;
            let change_percent = if base > 0.0 { change / base * 100.0 } else { 0.0 };

            Ok(ProviderQuote {
                symbol: symbol.clone(),
                price,
                currency: Some(String::from("USD")),
                change: Some(change),
                change_percent: Some(change_percent),
                as_of: UtcDateTime::now(),
            })
        })
    }

    fn daily_bars<'a>(
        &'a self,
        symbol: &'a Symbol,
        lookback_days: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ProviderBar>, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            if lookback_days == 0 {
                return Err(ProviderError::invalid_request(
                    "daily bars lookback must be greater than zero",
                ));
            }

            let seed = symbol_seed(symbol);
            let base = Self::base_price(symbol);
            let today = CalendarDate::today_utc();

            let mut bars = Vec::with_capacity(lookback_days as usize);
            for back in (0..lookback_days).rev() {
                let date = today.minus_days(back);
                let drift = ((seed + u64::from(back)) % 41) as f64 / 10.0 - 2.0;
                let open = (base + drift).max(1.0);
                let close = (open + ((seed + u64::from(back) * 7) % 17) as f64 / 10.0 - 0.8).max(1.0);

                bars.push(ProviderBar {
                    date,
                    open: Some(open),
                    close: Some(close),
                    volume: Some(25_000 + (seed + u64::from(back)) % 10_000),
                    currency: Some(String::from("USD")),
                });
            }

            Ok(bars)
        })
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}
