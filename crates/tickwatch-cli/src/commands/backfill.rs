use std::sync::Arc;

use tickwatch_core::backfill::BackfillReconciler;
use tickwatch_core::provider::QuoteProvider;
use tickwatch_warehouse::Warehouse;

use crate::cli::BackfillArgs;
use crate::commands::{parse_symbols, CommandOutcome};
use crate::error::CliError;

pub async fn run(
    args: &BackfillArgs,
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
) -> Result<CommandOutcome, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let reconciler = BackfillReconciler::new(provider, warehouse);

    let report = reconciler.run(&symbols, args.days).await?;
    Ok(CommandOutcome {
        data: serde_json::to_value(&report)?,
        partial_failure: !report.is_complete(),
    })
}
