mod backfill;
mod bars;
mod history;
mod refresh;
mod trends;
mod watch;

use std::sync::Arc;

use serde_json::Value;

use tickwatch_core::adapters::{MockProvider, YahooProvider};
use tickwatch_core::http_client::ReqwestHttpClient;
use tickwatch_core::provider::QuoteProvider;
use tickwatch_core::Symbol;
use tickwatch_warehouse::{Warehouse, WarehouseConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Result of one command: the JSON document to print, plus whether any
/// per-symbol work failed (exit code 3 without aborting output).
pub struct CommandOutcome {
    pub data: Value,
    pub partial_failure: bool,
}

impl CommandOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            partial_failure: false,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let warehouse = open_warehouse(cli)?;
    let provider = build_provider(cli);

    match &cli.command {
        Command::Refresh(args) => refresh::run(args, provider, warehouse).await,
        Command::Watch(args) => watch::run(args, provider, warehouse, cli.pretty).await,
        Command::Backfill(args) => backfill::run(args, provider, warehouse).await,
        Command::History(args) => history::run(args, &warehouse),
        Command::Bars(args) => bars::run(args, &warehouse),
        Command::Trends(args) => trends::run(args, provider, warehouse),
    }
}

fn open_warehouse(cli: &Cli) -> Result<Warehouse, CliError> {
    let config = match &cli.db_path {
        Some(path) => WarehouseConfig::at(path.clone()),
        None => WarehouseConfig::default(),
    };
    Ok(Warehouse::open(config)?)
}

fn build_provider(cli: &Cli) -> Arc<dyn QuoteProvider> {
    if cli.mock {
        Arc::new(MockProvider)
    } else {
        Arc::new(YahooProvider::new(Arc::new(ReqwestHttpClient::new())))
    }
}

/// Parse and normalize raw symbol arguments, dropping duplicates.
pub fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    let mut symbols = Vec::with_capacity(raw.len());
    for input in raw {
        let symbol = Symbol::parse(input)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}
