//! CLI for rovdash
//!
//! Subcommands:
//! - `serve`: run the dashboard backend (telemetry link + HTTP server)
//! - `push`: publish randomized telemetry snapshots (useful for demos
//!   without a live vehicle)

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use rovdash::client::{self, TelemetryClient};
use rovdash::config::load_config;
use rovdash::generator;
use rovdash::server::{self, AppState};
use rovdash::store::LatestValueStore;

#[derive(Parser)]
#[command(name = "rovdash")]
enum Command {
    /// Run the dashboard backend
    Serve,
    /// Publish randomized telemetry snapshots at a fixed interval
    Push {
        /// Milliseconds between snapshots (default: the configured interval)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    rovdash::utils::logging::init("info");

    let cmd = Command::parse();

    match cmd {
        Command::Serve => {
            if let Err(e) = run_serve().await {
                error!("server failed: {e}");
            }
        }
        Command::Push { interval_ms } => {
            if let Err(e) = run_push(interval_ms).await {
                error!("pusher failed: {e}");
            }
        }
    }
}

async fn run_serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let store = LatestValueStore::seeded();
    let client = Arc::new(TelemetryClient::from_settings(&config.mqtt));

    // The connection loop only enqueues inbound messages; a separate
    // consumer task decodes and applies them, so a slow update can never
    // stall the link.
    let (handler, mut inbound) = client::channel_handler(64);
    client.register_handler(handler);
    {
        let store = store.clone();
        tokio::spawn(async move {
            while let Some(msg) = inbound.recv().await {
                if let Err(e) = store.update(&msg.payload) {
                    warn!("discarding inbound message: {e}");
                }
            }
        });
    }

    let driver = client.clone().connect(None, None, None).await?;
    tokio::spawn(driver.run());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState { store, client };

    tokio::select! {
        result = server::serve(addr, state) => {
            if let Err(e) = result {
                error!("HTTP server exited unexpectedly: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_push(interval_ms: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;

    let client = Arc::new(TelemetryClient::from_settings(&config.mqtt));
    let driver = client.clone().connect(None, None, None).await?;
    tokio::spawn(driver.run());

    let interval = Duration::from_millis(interval_ms.unwrap_or(config.generator.interval_ms));

    tokio::select! {
        _ = generator::run(client, interval) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}
