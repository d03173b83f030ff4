//! PDF parser: a first-success chain. The source chains a MinerU layout
//! model and Markitdown behind an HTTP call; neither has a Rust binding in
//! this crate's dependency stack, so the chain is grounded on the two
//! extraction libraries the stack actually carries — `pdf-extract` first,
//! `lopdf` (raw content-stream text operators) as the fallback when the
//! primary extractor panics, times out, or yields nothing.

use std::sync::mpsc;
use std::time::Duration;

use crate::document::Document;

const EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

pub async fn parse(bytes: &[u8]) -> Document {
    if let Some(text) = extract_with_pdf_extract(bytes).await {
        if !text.trim().is_empty() {
            return Document::new(text);
        }
    }

    if let Some(text) = extract_with_lopdf(bytes) {
        if !text.trim().is_empty() {
            return Document::new(text);
        }
    }

    tracing::warn!("both PDF extractors failed to produce text");
    Document::empty()
}

/// `pdf-extract` can hang or panic on malformed input; run it on a blocking
/// thread with a bounded wait, mirroring the source's thread+timeout guard
/// around the same library.
async fn extract_with_pdf_extract(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.to_vec();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes));
        let _ = tx.send(result);
    });

    tokio::task::spawn_blocking(move || rx.recv_timeout(EXTRACT_TIMEOUT))
        .await
        .ok()?
        .ok()
        .and_then(|r| r.ok())
        .and_then(|r| r.ok())
}

fn extract_with_lopdf(bytes: &[u8]) -> Option<String> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| tracing::warn!(error = %e, "lopdf failed to load document"))
        .ok()?;

    let mut content = String::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => {
                content.push_str(&text);
                content.push('\n');
            }
            Err(e) => tracing::warn!(page = page_num, error = %e, "lopdf failed to extract page text"),
        }
    }
    Some(content)
}
