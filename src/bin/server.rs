//! Document ingestion service binary.
//!
//! Run with: cargo run --bin docreader-server

use docreader::config::ServiceConfig;
use docreader::server::IngestServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `GRPC_MAX_WORKERS` sizes the Tokio runtime's worker-thread pool (§5's
/// "bounded worker pool"), so it has to be read before the runtime is built
/// — too early for the `#[tokio::main]` attribute, whose thread count is a
/// compile-time literal. Build the runtime by hand instead.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docreader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let worker_threads = config.max_workers.max(1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let server = IngestServer::new(config)?;

    tracing::info!("document ingestion service listening on http://{}", server.address());
    tracing::info!("  POST /api/ingest/file - ingest an uploaded file");
    tracing::info!("  POST /api/ingest/url  - ingest a web page");
    tracing::info!("  GET  /health          - liveness check");
    tracing::info!("  GET  /ready           - readiness check");

    server.start().await?;

    Ok(())
}
