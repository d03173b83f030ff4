//! HTTP handlers for the two ingestion operations: by-file
//! (multipart upload) and by-URL (JSON body).

use axum::extract::{Multipart, State};
use axum::Json;

use crate::document::ChunkingConfig;
use crate::error::Error;
use crate::pipeline::{self, FileRequest, IngestResponse, UrlRequest};
use crate::server::state::AppState;

/// POST /api/ingest/file — multipart upload with a required `file` field
/// and an optional `read_config` field (JSON-encoded [`ChunkingConfig`]).
pub async fn ingest_file(State(state): State<AppState>, mut multipart: Multipart) -> Json<IngestResponse> {
    let mut file_name = String::new();
    let mut file_type = String::new();
    let mut file_content = Vec::new();
    let mut read_config = ChunkingConfig::default();
    let mut request_id = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => return Json(error_response(Error::internal(format!("malformed multipart body: {e}")))),
        };

        match field.name().unwrap_or("") {
            "file" => {
                file_name = field.file_name().unwrap_or("upload.bin").to_string();
                file_content = match field.bytes().await {
                    Ok(b) => b.to_vec(),
                    Err(e) => {
                        return Json(error_response(Error::internal(format!(
                            "failed to read file field: {e}"
                        ))))
                    }
                };
            }
            "file_type" => {
                if let Ok(bytes) = field.bytes().await {
                    file_type = String::from_utf8_lossy(&bytes).into_owned();
                }
            }
            "read_config" => {
                if let Ok(bytes) = field.bytes().await {
                    if let Ok(parsed) = serde_json::from_slice(&bytes) {
                        read_config = parsed;
                    }
                }
            }
            "request_id" => {
                if let Ok(bytes) = field.bytes().await {
                    request_id = Some(String::from_utf8_lossy(&bytes).into_owned());
                }
            }
            _ => {}
        }
    }

    if file_name.is_empty() {
        return Json(error_response(Error::config(
            "multipart body is missing a \"file\" field",
        )));
    }

    let request = FileRequest {
        file_name,
        file_type,
        file_content,
        read_config,
        request_id,
    };

    Json(pipeline::parse_file(&request, &state.collaborators).await)
}

/// POST /api/ingest/url — JSON body matching [`UrlRequest`].
pub async fn ingest_url(State(state): State<AppState>, Json(request): Json<UrlRequest>) -> Json<IngestResponse> {
    Json(pipeline::parse_url(&request, &state.collaborators).await)
}

fn error_response(e: Error) -> IngestResponse {
    IngestResponse {
        chunks: Vec::new(),
        error: Some(e.to_string()),
    }
}
