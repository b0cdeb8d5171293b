use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use tickwatch_core::engine::{RefreshConfig, RefreshEngine};
use tickwatch_core::provider::QuoteProvider;
use tickwatch_warehouse::Warehouse;

use crate::cli::WatchArgs;
use crate::commands::{parse_symbols, CommandOutcome};
use crate::error::CliError;

/// Refresh the watchlist on a fixed interval until Ctrl-C.
///
/// Each cycle's cache view is printed as it lands. The returned outcome is
/// a small run summary, so the last view is not printed twice on shutdown.
pub async fn run(
    args: &WatchArgs,
    provider: Arc<dyn QuoteProvider>,
    warehouse: Warehouse,
    pretty: bool,
) -> Result<CommandOutcome, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let config = RefreshConfig {
        max_concurrency: args.max_concurrency.max(1),
        interval: Duration::from_secs(args.interval_secs.max(1)),
    };
    let engine = RefreshEngine::new(provider, warehouse, config);

    let mut cycles: u64 = 0;
    let mut failed_cycles: u64 = 0;
    loop {
        let cache = engine.refresh_all(&symbols).await?;
        cycles += 1;
        if !cache.is_complete() {
            failed_cycles += 1;
        }

        let rendered = if pretty {
            serde_json::to_string_pretty(cache.as_ref())?
        } else {
            serde_json::to_string(cache.as_ref())?
        };
        println!("{rendered}");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!(cycles, "watch interrupted; shutting down");
                return Ok(CommandOutcome {
                    data: json!({
                        "cycles": cycles,
                        "cycles_with_failures": failed_cycles,
                        "last_refreshed_at": engine.last_refreshed().await,
                    }),
                    partial_failure: failed_cycles > 0,
                });
            }
            () = tokio::time::sleep(config.interval) => {}
        }
    }
}
