use tickwatch_core::Symbol;
use tickwatch_warehouse::Warehouse;

use crate::cli::BarsArgs;
use crate::commands::CommandOutcome;
use crate::error::CliError;

pub fn run(args: &BarsArgs, warehouse: &Warehouse) -> Result<CommandOutcome, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let records = warehouse.daily_bars_for_symbol(symbol.as_str())?;
    Ok(CommandOutcome::ok(serde_json::to_value(&records)?))
}
