use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

use searchvol::config::Config;
use searchvol::metrics;
use searchvol::server::Server;

/// Parameters for the `serve` command
pub struct ServeParams {
    pub bind: Option<SocketAddr>,
    pub config: Option<PathBuf>,
}

/// Run the HTTP API until Ctrl+C, then wait for running jobs
pub async fn serve(params: ServeParams) -> Result<()> {
    let mut config = Config::load(params.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = params.bind {
        config.server.bind_address = bind;
    }

    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    let server = Server::new(&config).context("Failed to initialize server")?;

    tracing::info!(
        bind = %config.server.bind_address,
        concurrency = config.lookup.concurrency,
        batch_size = config.lookup.batch_size,
        pacing_delay_ms = config.lookup.pacing_delay_ms,
        "Starting searchvol server"
    );

    server
        .start_with_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining jobs"),
        Err(e) => tracing::error!(error = %e, "Failed to wait for Ctrl+C"),
    }
}
