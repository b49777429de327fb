use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use gmr_worker::args::Args;
use gmr_worker::{router, MRWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Worker server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(MRWorker::new())))
        .with_graceful_shutdown(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Worker server exited..."),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
        })
        .await?;

    Ok(())
}
