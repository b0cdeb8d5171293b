use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::domain::{Symbol, UtcDateTime};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{ProviderBar, ProviderError, ProviderQuote, QuoteProvider};
use crate::retry::RetryPolicy;

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const REQUEST_TIMEOUT_MS: u64 = 10_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Quote provider backed by the Yahoo Finance chart endpoint.
///
/// The chart endpoint needs no cookie/crumb handshake, so a plain GET with a
/// browser-ish user agent is enough for both quotes and daily history.
pub struct YahooProvider {
    http_client: Arc<dyn HttpClient>,
    retry: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl YahooProvider {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry: RetryPolicy::default(),
            breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    async fn fetch_chart(
        &self,
        symbol: &Symbol,
        query: &str,
    ) -> Result<YahooChartResult, ProviderError> {
        let endpoint = format!(
            "{CHART_BASE_URL}/{}?{query}",
            urlencoding::encode(symbol.as_str())
        );

        let mut attempt = 0;
        let body = loop {
            if !self.breaker.allow_request() {
                return Err(ProviderError::unavailable(
                    "yahoo circuit breaker is open; skipping upstream call",
                ));
            }

            match self.execute_once(&endpoint, symbol).await {
                Ok(body) => {
                    self.breaker.record_success();
                    break body;
                }
                Err(error) => {
                    self.breaker.record_failure();
                    if !error.retryable() || attempt >= self.retry.max_retries {
                        return Err(error);
                    }
                    let delay = self.retry.delay(attempt);
                    debug!(
                        symbol = %symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying yahoo chart request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        };

        parse_chart_body(&body, symbol)
    }

    async fn execute_once(
        &self,
        endpoint: &str,
        symbol: &Symbol,
    ) -> Result<String, ProviderError> {
        let request = HttpRequest::get(endpoint)
            .with_header("accept", "application/json")
            .with_timeout_ms(REQUEST_TIMEOUT_MS);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                ProviderError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                ProviderError::malformed_response(format!(
                    "yahoo transport error: {}",
                    error.message()
                ))
            }
        })?;

        match response.status {
            404 => Err(ProviderError::not_found(symbol)),
            429 => Err(ProviderError::rate_limited(
                "yahoo rejected the request with status 429",
            )),
            status if !response.is_success() => Err(ProviderError::unavailable(format!(
                "yahoo upstream returned status {status}"
            ))),
            _ => Ok(response.body),
        }
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn quote<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderQuote, ProviderError>> + Send + 'a>> {
        Box::pin(async move {
            let result = self.fetch_chart(symbol, "range=1d&interval=1d").await?;
            let meta = result.meta.ok_or_else(|| {
                ProviderError::malformed_response("yahoo chart response is missing meta")
            })?;

            let price = meta.regular_market_price.ok_or_else(|| {
                ProviderError::malformed_response(format!(
                    "yahoo chart meta for '{symbol}' has no market price"
                ))
            })?;

            let previous_close = meta
                .chart_previous_close
                .or(meta.previous_close)
                .filter(|p| *p > 0.0);
            let change = previous_close.map(|prev| price - prev);
            let change_percent = previous_close.map(|prev| (price - prev) / prev * 100.0);

            let as_of = match meta.regular_market_time {
                Some(seconds) => UtcDateTime::from_unix_timestamp(seconds).map_err(|e| {
                    ProviderError::malformed_response(format!(
                        "yahoo chart meta timestamp is invalid: {e}"
                    ))
                })?,
                None => UtcDateTime::now(),
            };

            Ok(ProviderQuote {
                symbol: symbol.clone(),
                price,
                currency: meta.currency,
                change,
                change_percent,
                as_of,
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

            let now = UtcDateTime::now().unix_timestamp();
            let period1 = now - i64::from(lookback_days) * SECONDS_PER_DAY;
            let query = format!("period1={period1}&period2={now}&interval=1d");
            let result = self.fetch_chart(symbol, &query).await?;

            let currency = result.meta.as_ref().and_then(|m| m.currency.clone());
            let timestamps = result.timestamp.unwrap_or_default();
            let quote = result
                .indicators
                .and_then(|i| i.quote.into_iter().next())
                .ok_or_else(|| {
                    ProviderError::malformed_response(format!(
                        "yahoo chart response for '{symbol}' has no quote series"
                    ))
                })?;

            let mut bars = Vec::with_capacity(timestamps.len());
            for (index, &seconds) in timestamps.iter().enumerate() {
                let date = match UtcDateTime::from_unix_timestamp(seconds) {
                    Ok(ts) => ts.date(),
                    Err(_) => {
                        warn!(symbol = %symbol, seconds, "skipping bar with invalid timestamp");
                        continue;
                    }
                };

                bars.push(ProviderBar {
                    date,
                    open: series_value(&quote.open, index),
                    close: series_value(&quote.close, index),
                    volume: quote
                        .volume
                        .get(index)
                        .copied()
                        .flatten()
                        .and_then(|v| u64::try_from(v).ok()),
                    currency: currency.clone(),
                });
            }

            bars.sort_by_key(|bar| bar.date);
            Ok(bars)
        })
    }
}

fn series_value(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

fn parse_chart_body(body: &str, symbol: &Symbol) -> Result<YahooChartResult, ProviderError> {
    let parsed: YahooChartResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::malformed_response(format!("failed to parse yahoo chart response: {e}"))
    })?;

    if let Some(error) = parsed.chart.error {
        if error.code.eq_ignore_ascii_case("not found") {
            return Err(ProviderError::not_found(symbol));
        }
        return Err(ProviderError::unavailable(format!(
            "yahoo chart API error: {} ({})",
            error.description, error.code
        )));
    }

    parsed
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| {
            ProviderError::malformed_response(format!(
                "yahoo chart response for '{symbol}' has no result"
            ))
        })
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<YahooChartIndicators>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose", default)]
    chart_previous_close: Option<f64>,
    #[serde(rename = "previousClose", default)]
    previous_close: Option<f64>,
    #[serde(rename = "regularMarketTime", default)]
    regular_market_time: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}
