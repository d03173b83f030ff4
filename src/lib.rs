//! docreader: a document ingestion service that turns files and web pages
//! into size-bounded, overlap-aware, positionally-anchored text chunks,
//! with optional OCR/captioning for embedded images.
//!
//! The crate is organized around one pipeline: a [`parsing::Parser`] turns
//! raw bytes into a [`document::Document`], the [`chunking`] engine splits
//! its text into [`document::Chunk`]s, and [`pipeline`] ties the two
//! together with image attachment and multimodal post-processing. The
//! [`server`] module exposes that pipeline over HTTP.

pub mod chunking;
pub mod config;
pub mod document;
pub mod error;
pub mod offsets;
pub mod parsing;
pub mod pipeline;
pub mod processing;
pub mod providers;
pub mod server;

pub use document::{Chunk, ChunkingConfig, Document, ImageRecord};
pub use error::{Error, Result};
pub use pipeline::{parse_file, parse_url, Collaborators, FileRequest, IngestResponse, UrlRequest};
