use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use gmr_coordinator::api;
use gmr_coordinator::args::Args;
use gmr_coordinator::transport::HttpTransport;
use gmr_coordinator::{Coordinator, CoordinatorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Note: There are default values for EACH argument.
    let args = Args::parse();
    let config = CoordinatorConfig::from_args(&args)?;

    info!(
        map_workers = config.map_pool.len(),
        reduce_workers = config.reduce_pool.len(),
        "coordinator configured"
    );

    let coordinator = Arc::new(Coordinator::new(&config, Arc::new(HttpTransport::new())));
    let app = api::router(Arc::clone(&coordinator));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Coordinator listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    coordinator.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
