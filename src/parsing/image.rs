//! Image parser: uploads the original bytes through the object store, emits
//! a single Markdown image reference, and keeps the base64 payload in the
//! document's image map so OCR/VLM post-processing can run without
//! re-fetching the bytes from storage.

use base64::Engine;

use crate::document::Document;
use crate::providers::ObjectStore;

pub async fn parse(bytes: &[u8], filename: &str, store: &dyn ObjectStore) -> Document {
    let ext = filename
        .rsplit('.')
        .next()
        .filter(|e| !e.is_empty())
        .unwrap_or("png");

    let url = match store.upload_bytes(bytes, ext).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(error = %e, "image upload failed; embedding as data URL instead");
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            format!("data:image/{ext};base64,{encoded}")
        }
    };

    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    let content = format!("![{filename}]({url})");

    let mut images = std::collections::HashMap::new();
    images.insert(url, payload);
    Document::with_images(content, images)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::object_store::Base64ObjectStore;

    #[tokio::test]
    async fn emits_markdown_reference_and_keeps_payload() {
        let store = Base64ObjectStore;
        let doc = parse(b"hello", "photo.png", &store).await;
        assert!(doc.content.starts_with("![photo.png]("));
        assert_eq!(doc.images.len(), 1);
        let payload = doc.images.values().next().unwrap();
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(payload)
                .unwrap(),
            b"hello"
        );
    }
}
