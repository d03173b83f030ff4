//! HTTP routes for the ingestion operations.

pub mod ingest;

use axum::{routing::post, Router};

use crate::server::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ingest/file", post(ingest::ingest_file))
        .route("/ingest/url", post(ingest::ingest_url))
}
