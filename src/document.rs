//! The intermediate document produced by a parser and the chunk/image shapes
//! the chunking engine and the response envelope are built around.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_separators() -> Vec<String> {
    vec!["\n\n".to_string(), "\n".to_string(), "。".to_string()]
}

/// Provider selection for the object-store collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    Cos,
    Minio,
    #[default]
    Local,
    Base64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    pub region: String,
    pub endpoint: String,
    pub path_prefix: String,
    pub base_dir: String,
}

/// Selection for which HTTP dialect the VLM collaborator speaks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VlmInterfaceType {
    Openai,
    Ollama,
}

impl Default for VlmInterfaceType {
    fn default() -> Self {
        VlmInterfaceType::Openai
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VlmConfig {
    pub interface_type: VlmInterfaceType,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// Controls the chunking engine. Constructed via [`ChunkingConfig::new`] so the
/// `chunk_overlap < chunk_size` invariant can never be bypassed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
    pub enable_multimodal: bool,
    pub storage_config: StorageConfig,
    pub vlm_config: VlmConfig,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            separators: default_separators(),
            enable_multimodal: false,
            storage_config: StorageConfig::default(),
            vlm_config: VlmConfig::default(),
        }
    }
}

impl ChunkingConfig {
    /// Validates the size/overlap relationship. `chunk_overlap >= chunk_size` is
    /// rejected outright — not just `>`, since an overlap equal to the chunk size
    /// would never let the buffer shrink between chunks.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
        enable_multimodal: bool,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({chunk_overlap}) must be strictly less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
            enable_multimodal,
            storage_config: StorageConfig::default(),
            vlm_config: VlmConfig::default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be positive"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be strictly less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// The intermediate product of a parser: extracted text plus any images
/// referenced from it, keyed by the reference string used inside `content`.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub content: String,
    pub images: HashMap<String, String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            images: HashMap::new(),
        }
    }

    pub fn with_images(content: impl Into<String>, images: HashMap<String, String>) -> Self {
        Self {
            content: content.into(),
            images,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// A document is valid if it carries text or at least one image.
    pub fn is_valid(&self) -> bool {
        !self.content.is_empty() || !self.images.is_empty()
    }
}

/// An image attached to a chunk: its storage location, model-derived text, and
/// its anchor offsets within the parser's `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub original_url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub ocr_text: String,
    pub start: usize,
    pub end: usize,
}

/// A positionally-anchored slice of extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub seq: usize,
    pub content: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl Chunk {
    pub fn new(seq: usize, content: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            seq,
            content: content.into(),
            start,
            end,
            images: Vec::new(),
        }
    }
}
