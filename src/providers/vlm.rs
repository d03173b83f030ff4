//! VLM (caption) collaborator: `caption(image_base64) -> text`, selected per
//! request by `vlm_config.interface_type`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::document::VlmConfig;
use crate::error::Result;

const CAPTION_TIMEOUT: Duration = Duration::from_secs(30);
const CAPTION_PROMPT: &str = "Describe this image concisely for use as alt text.";

#[async_trait]
pub trait VlmClient: Send + Sync {
    async fn caption(&self, image_base64: &str) -> Result<String>;
}

pub fn create_vlm_client(config: &VlmConfig) -> Box<dyn VlmClient> {
    use crate::document::VlmInterfaceType;
    match config.interface_type {
        VlmInterfaceType::Openai => Box::new(OpenAiVlmClient::new(config)),
        VlmInterfaceType::Ollama => Box::new(OllamaVlmClient::new(config)),
    }
}

/// Speaks the OpenAI-compatible chat-completions API with an image_url
/// content part.
pub struct OpenAiVlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVlmClient {
    pub fn new(config: &VlmConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(CAPTION_TIMEOUT)
                .build()
                .expect("reqwest client"),
            base_url: if config.base_url.is_empty() {
                "https://api.openai.com/v1".to_string()
            } else {
                config.base_url.clone()
            },
            api_key: config.api_key.clone(),
            model: if config.model.is_empty() {
                "gpt-4o-mini".to_string()
            } else {
                config.model.clone()
            },
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ChatContent>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl VlmClient for OpenAiVlmClient {
    async fn caption(&self, image_base64: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            temperature: 0.2,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ChatContent::Text {
                        text: CAPTION_PROMPT.to_string(),
                    },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/png;base64,{image_base64}"),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<ChatResponse>().await {
                Ok(body) => Ok(body
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .unwrap_or_default()),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse VLM response");
                    Ok(String::new())
                }
            },
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "VLM call returned non-2xx");
                Ok(String::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "VLM call failed");
                Ok(String::new())
            }
        }
    }
}

/// Speaks the Ollama `/api/generate` endpoint with a base64 image attached.
pub struct OllamaVlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaVlmClient {
    pub fn new(config: &VlmConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(CAPTION_TIMEOUT)
                .build()
                .expect("reqwest client"),
            base_url: if config.base_url.is_empty() {
                "http://localhost:11434".to_string()
            } else {
                config.base_url.clone()
            },
            model: if config.model.is_empty() {
                "llava".to_string()
            } else {
                config.model.clone()
            },
        }
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl VlmClient for OllamaVlmClient {
    async fn caption(&self, image_base64: &str) -> Result<String> {
        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: CAPTION_PROMPT.to_string(),
            images: vec![image_base64.to_string()],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                match resp.json::<OllamaGenerateResponse>().await {
                    Ok(body) => Ok(body.response),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to parse Ollama response");
                        Ok(String::new())
                    }
                }
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Ollama call returned non-2xx");
                Ok(String::new())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ollama call failed");
                Ok(String::new())
            }
        }
    }
}
