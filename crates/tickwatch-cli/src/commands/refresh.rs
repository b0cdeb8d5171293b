use std::sync::Arc;

use tickwatch_core::engine::{RefreshConfig, RefreshEngine};
use tickwatch_core::provider::QuoteProvider;
use tickwatch_warehouse::Warehouse;

use crate::cli::RefreshArgs;
use crate::commands::{parse_symbols, CommandOutcome};
use crate::error::CliError;

pub async fn run(
    args: &RefreshArgs,
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
) -> Result<CommandOutcome, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let engine = RefreshEngine::new(provider, warehouse, RefreshConfig::default());

    let cache = engine.refresh_all(&symbols).await?;
    Ok(CommandOutcome {
        data: serde_json::to_value(cache.as_ref())?,
        partial_failure: !cache.is_complete(),
    })
}
