use std::sync::Arc;

use tickwatch_core::engine::{RefreshConfig, RefreshEngine};
use tickwatch_core::provider::QuoteProvider;
use tickwatch_core::{CalendarDate, Symbol};
use tickwatch_warehouse::Warehouse;

use crate::cli::TrendsArgs;
use crate::commands::CommandOutcome;
use crate::error::CliError;

pub fn run(
    args: &TrendsArgs,
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
) -> Result<CommandOutcome, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let date = match &args.date {
        Some(raw) => Some(CalendarDate::parse(raw)?),
        None => None,
    };

    let engine = RefreshEngine::new(provider, warehouse, RefreshConfig::default());
    let mut runs = engine.trend_sequences(&symbol, date)?;
    runs.reverse();
    Ok(CommandOutcome::ok(serde_json::to_value(&runs)?))
}
