//! Parley runner entry point
//!
//! Run with:
//! ```bash
//! PARLEY_TOKEN=... cargo run -p parley-gateway --bin parley
//! ```
//!
//! Configuration is loaded from environment variables. The runner
//! connects, then logs every dispatched event until interrupted.

use async_trait::async_trait;
use parley_common::{try_init_tracing, ClientConfig};
use parley_core::{EventSink, Notice};
use parley_gateway::GatewayClient;
use parley_rest::RestDispatcher;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Sink that logs dispatches instead of feeding a domain cache
struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn on_dispatch(&self, event: &str, sequence: u64, _payload: Value) {
        info!(event = %event, sequence, "Dispatch");
    }

    async fn on_notice(&self, notice: Notice) {
        warn!(message = %notice.message, "Gateway notice");
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Runner failed");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    info!("Starting parley runner...");

    // Load configuration
    let config = ClientConfig::from_env()?;
    info!(api_url = %config.api_url, intents = %config.intents, "Configuration loaded");

    let rest = RestDispatcher::new(&config);
    let gateway = GatewayClient::spawn(config, rest, Arc::new(LoggingEventSink));

    // Run until interrupted, then close without keeping the session
    tokio::signal::ctrl_c().await?;
    info!("Interrupt received; disconnecting");
    gateway.disconnect(false).await;
    gateway.join().await;

    Ok(())
}
