use anyhow::{Context, Result};
use clap::Parser;
use gossip_node::{init_logging, run, NodeArgs};
use tokio::sync::watch;
use tracing as log;

#[tokio::main]
async fn main() -> Result<()> {
    let args = NodeArgs::parse();
    let _log_guard =
        init_logging(&args.logging_config()).context("failed to initialize logging")?;
    let config = args.mesh_config().context("invalid mesh configuration")?;
    gossip_mesh::metrics::describe();

    log::info!(
        strategy = %config.strategy,
        dispatch_mode = %config.dispatch_mode,
        workers = config.workers,
        "Starting gossip node"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received Ctrl+C, shutting down");
                shutdown_tx.send_replace(true);
            }
            Err(e) => log::warn!("Cannot listen for Ctrl+C: {}", e),
        }
    });

    run(config, tokio::io::stdin(), tokio::io::stdout(), shutdown_rx)
        .await
        .context("node runtime failed")?;
    Ok(())
}
