//! The outer entry point ("parse(bytes) -> result"): dispatches
//! to a parser, runs the chunking engine over its output, attaches image
//! records by offset, and — when multimodal is enabled — fans out OCR and
//! captioning across the extracted images.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::document::{Chunk, ChunkingConfig, Document, ImageRecord};
use crate::error::{Error, Result};
use crate::offsets::{byte_to_char_offset, char_boundary_index};
use crate::parsing::{self, web, FileKind, Parser};
use crate::processing::{bounded_fan_out, DEFAULT_IMAGE_FANOUT};
use crate::providers::{create_vlm_client, ObjectStore, OcrBackend};

/// Request shape for the by-file ingestion operation.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRequest {
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    pub file_content: Vec<u8>,
    #[serde(default)]
    pub read_config: ChunkingConfig,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Request shape for the by-URL ingestion operation.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlRequest {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub read_config: ChunkingConfig,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// The response envelope: an ordered chunk list plus a free-form error
/// string for client diagnostics.
#[derive(Debug, Clone, Serialize, Default)]
pub struct IngestResponse {
    pub chunks: Vec<Chunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    fn error(message: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Long-lived collaborator handles shared across every request: a single
/// OCR engine and object-store client created once at service start.
pub struct Collaborators {
    pub object_store: Arc<dyn ObjectStore>,
    pub ocr: Arc<dyn OcrBackend>,
}

/// Parses a file request end to end: dispatch -> parser -> chunking ->
/// image attachment -> (optional) OCR/VLM fan-out.
///
/// Dispatcher misses and `ConfigError`s are surfaced via the response's
/// `error` field; every other parser-stage failure is already
/// absorbed inside `FirstSuccess`/`Pipeline` and never reaches here as an
/// `Err`.
pub async fn parse_file(request: &FileRequest, collaborators: &Collaborators) -> IngestResponse {
    let span = tracing::info_span!(
        "parse_file",
        request_id = %request.request_id.as_deref().unwrap_or("-"),
        file_name = %request.file_name,
    );
    parse_file_inner(request, collaborators).instrument(span).await
}

async fn parse_file_inner(request: &FileRequest, collaborators: &Collaborators) -> IngestResponse {
    if let Err(e) = request.read_config.validate() {
        return IngestResponse::error(e.to_string());
    }

    let kind = if request.file_type.is_empty() {
        FileKind::from_filename(&request.file_name)
    } else {
        FileKind::from_extension(&request.file_type)
    };

    let Some(kind) = kind else {
        let tag = if request.file_type.is_empty() {
            &request.file_name
        } else {
            &request.file_type
        };
        tracing::warn!(tag, "dispatcher has no parser for this file kind");
        return IngestResponse::error(Error::unsupported_kind(tag.clone()).to_string());
    };

    if matches!(kind, FileKind::Csv | FileKind::Xls | FileKind::Xlsx) {
        return match parse_tabular(kind, &request.file_content) {
            Ok(chunks) => {
                finish_with_multimodal(Document::empty(), chunks, &request.read_config, collaborators).await
            }
            Err(e) => IngestResponse::error(e.to_string()),
        };
    }

    let parser = match parsing::dispatch(kind, collaborators.object_store.as_ref()) {
        Ok(p) => p,
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    let document = match parser.parse_into_text(&request.file_content).await {
        Ok(doc) => doc,
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    let chunks = match crate::chunking::split(&document.content, &request.read_config) {
        Ok(c) => c,
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    tracing::info!(chunk_count = chunks.len(), "file parsed");
    finish_with_multimodal(document, chunks, &request.read_config, collaborators).await
}

/// Parses a URL request: fetch -> Markdown post-processing -> chunking ->
/// image attachment -> (optional) OCR/VLM fan-out.
pub async fn parse_url(request: &UrlRequest, collaborators: &Collaborators) -> IngestResponse {
    let span = tracing::info_span!(
        "parse_url",
        request_id = %request.request_id.as_deref().unwrap_or("-"),
        url = %request.url,
    );
    parse_url_inner(request, collaborators).instrument(span).await
}

async fn parse_url_inner(request: &UrlRequest, collaborators: &Collaborators) -> IngestResponse {
    if let Err(e) = request.read_config.validate() {
        return IngestResponse::error(e.to_string());
    }

    let fetched = match web::fetch(&request.url, &request.title).await {
        Ok(doc) => doc,
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    let markdown = Parser::Pipeline(vec![
        Parser::MarkdownTableFormatter,
        Parser::MarkdownBase64Lifter(collaborators.object_store.as_ref()),
    ]);

    let document = match markdown.parse_into_text(fetched.content.as_bytes()).await {
        Ok(doc) => Document::with_images(doc.content, {
            let mut images = fetched.images;
            images.extend(doc.images);
            images
        }),
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    let chunks = match crate::chunking::split(&document.content, &request.read_config) {
        Ok(c) => c,
        Err(e) => return IngestResponse::error(e.to_string()),
    };

    finish_with_multimodal(document, chunks, &request.read_config, collaborators).await
}

fn parse_tabular(kind: FileKind, bytes: &[u8]) -> Result<Vec<Chunk>> {
    match kind {
        FileKind::Csv => crate::parsing::csv_parser::parse_to_chunks(bytes),
        FileKind::Xls | FileKind::Xlsx => crate::parsing::spreadsheet::parse_to_chunks(bytes),
        _ => unreachable!("parse_tabular called with a non-tabular kind"),
    }
}

/// Shared tail of both entry points: attach image records by offset, then
/// (if enabled) fan out OCR/captioning across them.
async fn finish_with_multimodal(
    document: Document,
    mut chunks: Vec<Chunk>,
    config: &ChunkingConfig,
    collaborators: &Collaborators,
) -> IngestResponse {
    let anchors = locate_image_refs(&document.content, &document.images);

    let mut records: Vec<ImageRecord> = anchors
        .into_iter()
        .map(|(url, start, end)| ImageRecord {
            original_url: url.clone(),
            url,
            caption: String::new(),
            ocr_text: String::new(),
            start,
            end,
        })
        .collect();

    if config.enable_multimodal && !records.is_empty() {
        let vlm = create_vlm_client(&config.vlm_config);
        let ocr = Arc::clone(&collaborators.ocr);
        let payloads: Vec<(usize, Option<Vec<u8>>)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (i, document.images.get(&r.original_url).and_then(decode_payload)))
            .collect();

        let vlm: Arc<dyn crate::providers::VlmClient> = Arc::from(vlm);
        let jobs: Vec<_> = payloads
            .into_iter()
            .map(|(i, bytes)| {
                let ocr = Arc::clone(&ocr);
                let vlm = Arc::clone(&vlm);
                move || async move {
                    let Some(bytes) = bytes else {
                        return (i, String::new(), String::new());
                    };
                    let ocr_text = ocr.predict(&bytes).await.unwrap_or_default();
                    let b64 = base64_encode(&bytes);
                    let caption = vlm.caption(&b64).await.unwrap_or_default();
                    (i, caption, ocr_text)
                }
            })
            .collect();

        for (i, caption, ocr_text) in bounded_fan_out(jobs, DEFAULT_IMAGE_FANOUT).await {
            records[i].caption = caption;
            records[i].ocr_text = ocr_text;
        }
    }

    attach_images_to_chunks(&mut chunks, records);

    IngestResponse {
        chunks,
        error: None,
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn decode_payload(payload: &String) -> Option<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(payload).ok()
}

/// Finds the first occurrence of `![alt](key)` for every key in `images`,
/// returning `(key, start_char, end_char)` sorted by ascending start —
/// "first reference offset".
fn locate_image_refs(content: &str, images: &HashMap<String, String>) -> Vec<(String, usize, usize)> {
    let boundaries = char_boundary_index(content);
    let mut found = Vec::new();

    for key in images.keys() {
        let pattern = format!(r"!\[[^\]]*\]\({}\)", regex::escape(key));
        let Ok(re) = Regex::new(&pattern) else { continue };
        if let Some(m) = re.find(content) {
            let start = byte_to_char_offset(&boundaries, m.start());
            let end = byte_to_char_offset(&boundaries, m.end());
            found.push((key.clone(), start, end));
        }
    }

    found.sort_by_key(|(_, start, _)| *start);
    found
}

/// Attaches each image record to the chunk whose `[start, end)` range
/// covers the image's anchor offset, in ascending anchor order within a
/// chunk.
fn attach_images_to_chunks(chunks: &mut [Chunk], records: Vec<ImageRecord>) {
    for record in records {
        if let Some(chunk) = chunks
            .iter_mut()
            .find(|c| record.start >= c.start && record.start < c.end)
        {
            chunk.images.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::object_store::Base64ObjectStore;
    use crate::providers::ocr::DummyOcrBackend;

    fn collaborators() -> Collaborators {
        Collaborators {
            object_store: Arc::new(Base64ObjectStore),
            ocr: Arc::new(DummyOcrBackend),
        }
    }

    #[tokio::test]
    async fn unsupported_kind_surfaces_as_error() {
        let request = FileRequest {
            file_name: "x.bin".into(),
            file_type: String::new(),
            file_content: vec![1, 2, 3],
            read_config: ChunkingConfig::default(),
            request_id: None,
        };
        let response = parse_file(&request, &collaborators()).await;
        assert!(response.error.is_some());
        assert!(response.chunks.is_empty());
    }

    #[tokio::test]
    async fn csv_bypasses_chunking_engine_with_precise_offsets() {
        let request = FileRequest {
            file_name: "data.csv".into(),
            file_type: String::new(),
            file_content: b"a,b\n1,2\n3,4\n".to_vec(),
            read_config: ChunkingConfig::default(),
            request_id: None,
        };
        let response = parse_file(&request, &collaborators()).await;
        assert!(response.error.is_none());
        assert_eq!(response.chunks.len(), 2);
        assert_eq!(response.chunks[0].content, "a: 1, b: 2\n");
    }

    #[tokio::test]
    async fn text_file_chunks_and_reports_no_error() {
        let request = FileRequest {
            file_name: "note.txt".into(),
            file_type: String::new(),
            file_content: b"hello world".to_vec(),
            read_config: ChunkingConfig::default(),
            request_id: None,
        };
        let response = parse_file(&request, &collaborators()).await;
        assert!(response.error.is_none());
        assert_eq!(response.chunks.len(), 1);
        assert_eq!(response.chunks[0].content, "hello world");
    }

    #[tokio::test]
    async fn image_is_attached_to_the_chunk_covering_its_anchor() {
        let store = Base64ObjectStore;
        let doc = crate::parsing::image::parse(b"hi", "pic.png", &store).await;
        let config = ChunkingConfig::default();
        let chunks = crate::chunking::split(&doc.content, &config).unwrap();
        let collaborators = collaborators();
        let response = finish_with_multimodal(doc, chunks, &config, &collaborators).await;
        assert_eq!(response.chunks.len(), 1);
        assert_eq!(response.chunks[0].images.len(), 1);
    }

    #[tokio::test]
    async fn config_error_surfaces_before_dispatch() {
        let mut config = ChunkingConfig::default();
        config.chunk_overlap = config.chunk_size; // invalid: must skip validate() path
        let request = FileRequest {
            file_name: "note.txt".into(),
            file_type: String::new(),
            file_content: b"hello".to_vec(),
            read_config: config,
            request_id: None,
        };
        let response = parse_file(&request, &collaborators()).await;
        assert!(response.error.is_some());
    }
}
