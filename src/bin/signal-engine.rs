//! signalgen live engine
//!
//! Streams ticks for the configured watchlist, evaluates the active rule on
//! every completed candle, and logs signals until Ctrl-C.

use dotenvy::dotenv;
use signalgen::config::{get_environment, EngineConfig};
use signalgen::core::Orchestrator;
use signalgen::logging;
use signalgen::metrics::Metrics;
use signalgen::services::WebSocketFeed;
use signalgen::signals::TracingSink;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = EngineConfig::from_env()?;
    let rule = config.load_rule()?;
    info!(
        environment = %get_environment(),
        symbols = ?config.watchlist.symbols(),
        timeframe = %config.runtime.timeframe,
        rule = %rule.name,
        "Starting signal engine service"
    );

    let metrics = Arc::new(Metrics::new()?);
    let feed = Arc::new(WebSocketFeed::new(&config.ws_url, &config.http_url)?);
    let sink = Arc::new(TracingSink);

    let orchestrator = Orchestrator::builder(feed)
        .config(config.runtime.clone())
        .signal_sink(sink.clone())
        .status_sink(sink)
        .metrics(metrics.clone())
        .build();

    orchestrator.start(config.watchlist.clone(), rule).await?;

    let mut status_check = tokio::time::interval(std::time::Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            _ = status_check.tick() => {
                if !orchestrator.is_running() {
                    error!(status = ?orchestrator.status(), "Engine stopped on its own");
                    break;
                }
            }
        }
    }

    orchestrator.stop().await;
    match metrics.export() {
        Ok(text) => info!(metrics = %text, "Final metrics"),
        Err(e) => error!(error = %e, "Failed to export metrics"),
    }
    info!("Signal engine service stopped");
    Ok(())
}
