//! Word (doc/docx) parser: a first-success chain. `docx-rs` handles the
//! common `.docx` case directly; `.doc` (the legacy binary format) is
//! converted to `.docx` with LibreOffice when available. The plain-text
//! fallback anchors the bottom of the chain so the service degrades to
//! partial text rather than failing outright when no converter is present.

use std::io::Write;
use std::time::Duration;

use docx_rs::read_docx;

use crate::document::Document;
use crate::parsing::text::decode_bytes;
use crate::processing::{run_converter, scoped_temp_dir};

const LIBREOFFICE_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn parse(bytes: &[u8], is_legacy_doc: bool) -> Document {
    if is_legacy_doc {
        if let Some(converted) = convert_doc_to_docx(bytes).await {
            if let Some(doc) = parse_docx(&converted) {
                return doc;
            }
        }
    } else if let Some(doc) = parse_docx(bytes) {
        return doc;
    }

    tracing::warn!("falling back to plain-text decoding for Word document");
    Document::new(decode_bytes(bytes))
}

fn parse_docx(bytes: &[u8]) -> Option<Document> {
    let docx = read_docx(bytes)
        .map_err(|e| tracing::warn!(error = %e, "docx-rs failed to parse document"))
        .ok()?;

    let mut content = String::new();
    for child in &docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for run_child in &paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = run_child {
                    for text_child in &run.children {
                        if let docx_rs::RunChild::Text(text) = text_child {
                            content.push_str(&text.text);
                        }
                    }
                }
            }
            content.push('\n');
        }
    }

    if content.trim().is_empty() {
        None
    } else {
        Some(Document::new(content))
    }
}

async fn convert_doc_to_docx(bytes: &[u8]) -> Option<Vec<u8>> {
    if !crate::processing::executable_available("soffice") {
        tracing::warn!("soffice not available; cannot convert legacy .doc");
        return None;
    }

    let dir = scoped_temp_dir().ok()?;
    let input_path = dir.path().join("input.doc");
    std::fs::File::create(&input_path)
        .and_then(|mut f| f.write_all(bytes))
        .map_err(|e| tracing::warn!(error = %e, "failed to write temp .doc file"))
        .ok()?;

    let out_dir = dir.path().to_string_lossy().into_owned();
    let input_str = input_path.to_string_lossy().into_owned();
    let args = [
        "--headless",
        "--convert-to",
        "docx",
        "--outdir",
        out_dir.as_str(),
        input_str.as_str(),
    ];

    run_converter("soffice", &args, LIBREOFFICE_TIMEOUT)
        .await
        .map_err(|e| tracing::warn!(error = %e, "libreoffice conversion failed"))
        .ok()?;

    let output_path = dir.path().join("input.docx");
    std::fs::read(output_path)
        .map_err(|e| tracing::warn!(error = %e, "converted docx not found"))
        .ok()
}
