//! OCR collaborator: `predict(image) -> text`. The concrete backend is
//! selected once at process start from `OCR_BACKEND` and shared (via `Arc`)
//! across every worker rather than re-created per request.

use async_trait::async_trait;
use base64::Engine;

use crate::error::Result;

#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn predict(&self, image: &[u8]) -> Result<String>;
    fn name(&self) -> &str;
}

/// Always returns empty text. The default when no real backend is
/// configured, so the service stays runnable without any OCR dependency
/// installed.
pub struct DummyOcrBackend;

#[async_trait]
impl OcrBackend for DummyOcrBackend {
    async fn predict(&self, _image: &[u8]) -> Result<String> {
        tracing::warn!("dummy OCR backend is in use");
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "dummy"
    }
}

/// An HTTP-backed OCR backend, used for both `paddle` and `nanonets`: neither
/// has a native Rust binding, so both are modeled as inference services
/// reached over HTTP, consistent with how the VLM collaborator is reached.
pub struct HttpOcrBackend {
    client: reqwest::Client,
    endpoint: String,
    backend_name: &'static str,
}

impl HttpOcrBackend {
    pub fn new(endpoint: impl Into<String>, backend_name: &'static str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            endpoint: endpoint.into(),
            backend_name,
        }
    }
}

#[derive(serde::Serialize)]
struct OcrRequest<'a> {
    image_base64: &'a str,
}

#[derive(serde::Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn predict(&self, image: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let request = OcrRequest {
            image_base64: &encoded,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<OcrResponse>().await {
                    Ok(body) => Ok(body.text),
                    Err(e) => {
                        tracing::warn!(backend = self.backend_name, error = %e, "failed to parse OCR response");
                        Ok(String::new())
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(backend = self.backend_name, status = %resp.status(), "OCR call returned non-2xx");
                Ok(String::new())
            }
            Err(e) => {
                tracing::warn!(backend = self.backend_name, error = %e, "OCR call failed");
                Ok(String::new())
            }
        }
    }

    fn name(&self) -> &str {
        self.backend_name
    }
}

/// Selects a backend from the `OCR_BACKEND` env var (`paddle | nanonets |
/// dummy`), defaulting to `dummy` for any other value.
pub fn create_ocr_backend() -> Box<dyn OcrBackend> {
    let backend = std::env::var("OCR_BACKEND").unwrap_or_else(|_| "dummy".to_string());
    match backend.to_lowercase().as_str() {
        "paddle" => Box::new(HttpOcrBackend::new(
            std::env::var("PADDLE_OCR_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:8866/predict/ocr_system".to_string()),
            "paddle",
        )),
        "nanonets" => Box::new(HttpOcrBackend::new(
            std::env::var("NANONETS_OCR_ENDPOINT")
                .unwrap_or_else(|_| "https://app.nanonets.com/api/v2/OCR/Model".to_string()),
            "nanonets",
        )),
        _ => Box::new(DummyOcrBackend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_backend_returns_empty_text() {
        let backend = DummyOcrBackend;
        assert_eq!(backend.predict(b"not an image").await.unwrap(), "");
    }
}
