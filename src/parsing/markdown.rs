//! Markdown utilities: table formatter and inline-base64 image lifter.
//! The Markdown parser itself is `Pipeline(MarkdownTableFormatter,
//! MarkdownBase64Lifter)` (see [`super::Parser`]).

use std::collections::HashMap;
use std::sync::LazyLock;

use base64::Engine;
use regex::{Captures, Regex};

use crate::document::Document;
use crate::providers::ObjectStore;

static LINE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\|(.+)\|[ \t]*$").unwrap());
static ALIGN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\|((?:\s*:?-+:?\s*\|)+)[ \t]*$").unwrap());
static B64_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(data:image/(\w+)\+?\w*;base64,([^\)]+)\)").unwrap()
});

/// Rewrites every Markdown table to canonical spacing: cells stripped and
/// padded with one space on each side of a pipe, alignment-row dashes
/// normalized to exactly three while preserving `:` markers, leading
/// indentation preserved. Applied first to every row (including alignment
/// rows, whose dash runs survive cell padding untouched), then a second pass
/// fixes the alignment row's dash count precisely.
pub fn format_table(content: &str) -> String {
    let after_rows = LINE_PATTERN.replace_all(content, |caps: &Captures| {
        let indent = &caps[1];
        let inner = &caps[2];
        let cells: Vec<String> = inner.split('|').map(|c| format!(" {} ", c.trim())).collect();
        format!("{indent}|{}|", cells.join("|"))
    });

    ALIGN_PATTERN
        .replace_all(&after_rows, |caps: &Captures| {
            let indent = &caps[1];
            let body = &caps[2];
            let cells: Vec<String> = body
                .split('|')
                .filter(|c| !c.trim().is_empty())
                .map(|c| {
                    let trimmed = c.trim();
                    let left = trimmed.starts_with(':');
                    let right = trimmed.ends_with(':');
                    let mut cell = String::new();
                    if left {
                        cell.push(':');
                    }
                    cell.push_str("---");
                    if right {
                        cell.push(':');
                    }
                    format!(" {cell} ")
                })
                .collect();
            format!("{indent}|{}|", cells.join("|"))
        })
        .into_owned()
}

pub fn format_table_document(content: &str) -> Document {
    Document::new(format_table(content))
}

/// Matches `![alt](data:image/<ext>[+...];base64,<payload>)`. For every
/// match: decodes the payload (malformed payloads are skipped with a log and
/// left untouched), uploads through the object store, rewrites the node to
/// `![alt](<uploaded-url>)`, and records `uploaded-url -> base64 payload`.
pub async fn lift_base64_images(
    content: &str,
    store: &dyn ObjectStore,
) -> (String, HashMap<String, String>) {
    let mut result = String::with_capacity(content.len());
    let mut images = HashMap::new();
    let mut last_end = 0;

    for caps in B64_IMAGE.captures_iter(content) {
        let m = caps.get(0).unwrap();
        result.push_str(&content[last_end..m.start()]);

        let alt = &caps[1];
        let ext = &caps[2];
        let payload = caps[3].trim();

        match base64::engine::general_purpose::STANDARD.decode(payload) {
            Ok(bytes) => match store.upload_bytes(&bytes, ext).await {
                Ok(url) => {
                    result.push_str(&format!("![{alt}]({url})"));
                    images.insert(url, payload.to_string());
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to upload base64 image; leaving original node");
                    result.push_str(m.as_str());
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed base64 image payload");
                result.push_str(m.as_str());
            }
        }

        last_end = m.end();
    }
    result.push_str(&content[last_end..]);

    (result, images)
}

/// Rewrites every `![alt](old)` to `![alt](new)` per the given mapping;
/// unknown paths are left untouched. Used by the PDF and Web parsers after
/// they upload locally-extracted images.
pub fn replace_image_paths(content: &str, mapping: &HashMap<String, String>) -> String {
    static IMAGE_REF: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^\)]*)\)").unwrap());

    IMAGE_REF
        .replace_all(content, |caps: &Captures| {
            let alt = &caps[1];
            let path = &caps[2];
            match mapping.get(path) {
                Some(new_path) => format!("![{alt}]({new_path})"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::object_store::Base64ObjectStore;

    #[test]
    fn pads_cells_and_normalizes_alignment_row() {
        let input = "|h1|h2|\n|---|:--:|\n|a|b|\n";
        let formatted = format_table(input);
        assert!(formatted.contains("| h1 | h2 |"));
        assert!(formatted.contains("| --- | :---: |"));
        assert!(formatted.contains("| a | b |"));
    }

    #[test]
    fn formatting_twice_is_idempotent() {
        let input = "| h1 | h2 |\n| --- | --- |\n| a | b |\n";
        let once = format_table(input);
        let twice = format_table(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_base64_images_survive_lifting_unchanged() {
        let store = Base64ObjectStore;
        let input = "![alt](https://example.com/x.png)";
        let (content, images) =
            tokio_test::block_on(lift_base64_images(input, &store));
        assert_eq!(content, input);
        assert!(images.is_empty());
    }

    #[test]
    fn base64_image_is_lifted_and_recorded() {
        let store = Base64ObjectStore;
        let input = "![x](data:image/png;base64,aGVsbG8=)";
        let (content, images) =
            tokio_test::block_on(lift_base64_images(input, &store));
        assert!(content.starts_with("![x](data:image/png;base64,"));
        assert_eq!(images.len(), 1);
        assert_eq!(images.values().next().unwrap(), "aGVsbG8=");
    }
}
