//! # FleetLine Node
//!
//! Real-time driver location fan-out and trip status tracking in one process.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (`FL_CONFIG` file, then `FL_*` overrides)
//! 3. Load the delivery status catalog and seed trips
//! 4. Start the dispatch event log
//! 5. Serve the gateway until Ctrl+C

use anyhow::{Context, Result};
use node_runtime::{load_from_env, FleetlineNode};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    info!("===========================================");
    info!("  FleetLine Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = load_from_env().context("failed to load configuration")?;
    let node = FleetlineNode::build(config).await?;
    let _event_log = node.spawn_event_log();

    node.run(shutdown_signal()).await?;

    info!("Node stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}
