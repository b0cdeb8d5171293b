//! # Tickwatch Core
//!
//! Quote ingestion, caching, and trend analysis for tracked market symbols.
//!
//! ## Overview
//!
//! The core crate wires a [`provider::QuoteProvider`] to the DuckDB-backed
//! warehouse and exposes two orchestrators:
//!
//! - **[`engine::RefreshEngine`]** runs refresh cycles: fetch a quote per
//!   symbol, anchor the day-open row, append the snapshot, and swap in a new
//!   immutable cache view.
//! - **[`backfill::BackfillReconciler`]** reconciles daily-bar history,
//!   replace-writing one transaction per symbol.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo chart API, deterministic mock) |
//! | [`backfill`] | Daily-bar history reconciliation |
//! | [`circuit_breaker`] | Circuit breaker guarding upstream calls |
//! | [`domain`] | Domain models (symbols, snapshots, bars, trends) |
//! | [`engine`] | Refresh cycle orchestration and quote cache |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`provider`] | Quote provider contract and raw payload types |
//! | [`retry`] | Backoff schedule for retryable provider failures |
//! | [`trend`] | Pure trend math over snapshot history |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickwatch_core::adapters::MockProvider;
//! use tickwatch_core::engine::{RefreshConfig, RefreshEngine};
//! use tickwatch_core::Symbol;
//! use tickwatch_warehouse::Warehouse;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let engine = RefreshEngine::new(
//!         Arc::new(MockProvider),
//!         warehouse,
//!         RefreshConfig::default(),
//!     );
//!
//!     let watchlist = vec![Symbol::parse("AAPL")?, Symbol::parse("MSFT")?];
//!     let cache = engine.refresh_all(&watchlist).await?;
//!     for (symbol, entry) in &cache.entries {
//!         println!("{symbol}: {entry:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod backfill;
pub mod circuit_breaker;
pub mod domain;
pub mod engine;
mod error;
pub mod http_client;
pub mod provider;
pub mod retry;
pub mod trend;

pub use domain::{
    validate_currency_code, CalendarDate, DailyBar, QuoteSnapshot, QuoteWithTrend, Symbol,
    TrendDirection, TrendSequence, UtcDateTime, DEFAULT_CURRENCY,
};
pub use error::{CoreError, ValidationError};
