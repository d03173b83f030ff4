//! HTTP edge for the ingestion service: health/readiness plus
//! the by-file and by-URL ingestion operations, built on the same
//! Axum/CORS/Compression/Trace stack the rest of this corpus uses.

pub mod routes;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Ingress/egress message size bound (§5/§6): oversize bodies are rejected
/// by the transport layer before reaching the core.
const MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;

/// The ingestion HTTP server.
pub struct IngestServer {
    state: AppState,
}

impl IngestServer {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Ok(Self {
            state: AppState::new(config)?,
        })
    }

    /// Builds the server from environment-derived configuration (§6).
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env())
    }

    fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .nest("/api", routes::api_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
            .layer(DefaultBodyLimit::max(MAX_MESSAGE_SIZE))
    }

    /// Binds and serves until the process is signalled to stop.
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("0.0.0.0:{}", self.state.config.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid address: {e}")))?;

        let router = self.build_router();

        tracing::info!(%addr, "starting ingestion server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::internal(format!("failed to bind {addr}: {e}")))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("server error: {e}")))?;

        Ok(())
    }

    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.state.config.port)
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
