//! The parser composition framework: a closed enumeration of
//! parser kinds, two generic combinators built from it, a dispatcher from
//! file kind to parser, and the format-specific leaf parsers.
//!
//! A dynamically-typed source would assemble `FirstSuccess`/`Pipeline`
//! variants by subclassing at runtime with a fixed tuple of children; here
//! they are just two more [`Parser`] variants that own an ordered
//! `Vec<Parser>`, constructed by value once at dispatch time (see §9 of the
//! spec for the rationale).

pub mod csv_parser;
pub mod image;
pub mod markdown;
pub mod pdf;
pub mod spreadsheet;
pub mod text;
pub mod web;
pub mod word;

use crate::document::Document;
use crate::error::Result;
use crate::providers::ObjectStore;

/// The file-kind tag the dispatcher switches on. Constructed from a
/// filename extension (§6: "if `file_type` is empty it is inferred from the
/// extension of `file_name`") or supplied directly by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Txt,
    Markdown,
    Doc,
    Docx,
    Pdf,
    Csv,
    Xls,
    Xlsx,
    Image,
    Url,
}

impl FileKind {
    /// Infers a kind from a filename's extension. Image extensions are
    /// recognized by a small allowlist since the dispatcher treats every
    /// raster format identically (upload + reference, see
    /// [`image::parse`]).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(FileKind::Txt),
            "md" | "markdown" => Some(FileKind::Markdown),
            "doc" => Some(FileKind::Doc),
            "docx" => Some(FileKind::Docx),
            "pdf" => Some(FileKind::Pdf),
            "csv" => Some(FileKind::Csv),
            "xls" => Some(FileKind::Xls),
            "xlsx" => Some(FileKind::Xlsx),
            "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" | "tiff" | "svg" => {
                Some(FileKind::Image)
            }
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next().unwrap_or("");
        Self::from_extension(ext)
    }
}

/// A parser stage. Exposes one operation, `parse_into_text`, which turns
/// bytes into a [`Document`]. Concrete format parsers are either a leaf
/// variant or one of the two combinators, which recurse into their children.
pub enum Parser<'a> {
    Text,
    Csv,
    Spreadsheet,
    MarkdownTableFormatter,
    MarkdownBase64Lifter(&'a dyn ObjectStore),
    Word { is_legacy_doc: bool },
    Pdf,
    Image(&'a dyn ObjectStore),
    Web,
    /// Tries each child in order; returns the first valid [`Document`]
    /// (§3's validity predicate). Child errors are swallowed, not
    /// propagated — they mean "try the next stage".
    FirstSuccess(Vec<Parser<'a>>),
    /// Threads `Document.content` through each child in turn, re-encoding it
    /// as bytes between stages, and merges every stage's image map into the
    /// result (later stages win on key collision). A child error aborts the
    /// pipeline.
    Pipeline(Vec<Parser<'a>>),
}

impl<'a> Parser<'a> {
    pub async fn parse_into_text(&self, content: &[u8]) -> Result<Document> {
        match self {
            Parser::Text => Ok(text::parse(content)),
            Parser::Csv => {
                // The CSV parser renders straight to chunks, bypassing the
                // general chunking engine; callers that need a
                // `Document` (e.g. a Pipeline stage) get its rendered text.
                let rendered = csv_parser::render_to_text(content);
                Ok(Document::new(rendered))
            }
            Parser::Spreadsheet => {
                let rendered = spreadsheet::render_to_text(content)?;
                Ok(Document::new(rendered))
            }
            Parser::MarkdownTableFormatter => {
                let text = String::from_utf8_lossy(content);
                Ok(markdown::format_table_document(&text))
            }
            Parser::MarkdownBase64Lifter(store) => {
                let text = String::from_utf8_lossy(content);
                let (rewritten, images) = markdown::lift_base64_images(&text, *store).await;
                Ok(Document::with_images(rewritten, images))
            }
            Parser::Word { is_legacy_doc } => Ok(word::parse(content, *is_legacy_doc).await),
            Parser::Pdf => Ok(pdf::parse(content).await),
            Parser::Image(store) => Ok(image::parse(content, "image", *store).await),
            Parser::Web => Err(crate::error::Error::internal(
                "Web parser must be invoked via parse_url, not parse_into_text",
            )),
            Parser::FirstSuccess(children) => {
                for child in children {
                    match child.parse_into_text(content).await {
                        Ok(doc) if doc.is_valid() => return Ok(doc),
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!(error = %e, "parser stage failed; trying next");
                            continue;
                        }
                    }
                }
                Ok(Document::empty())
            }
            Parser::Pipeline(children) => {
                let mut doc = Document::new(String::from_utf8_lossy(content).into_owned());
                for child in children {
                    let next = child.parse_into_text(doc.content.as_bytes()).await?;
                    let mut images = doc.images;
                    images.extend(next.images);
                    doc = Document::with_images(next.content, images);
                }
                Ok(doc)
            }
        }
    }
}

/// The Markdown parser: `Pipeline(MarkdownTableFormatter, MarkdownBase64Lifter)`.
pub fn markdown_parser(store: &dyn ObjectStore) -> Parser<'_> {
    Parser::Pipeline(vec![
        Parser::MarkdownTableFormatter,
        Parser::MarkdownBase64Lifter(store),
    ])
}

/// The Word parser: a first-success chain. `docx-rs` handles `.docx`
/// directly; legacy `.doc` is converted first. Both land on plain-text
/// decoding as the always-available bottom of the chain (§4.5).
pub fn word_parser(is_legacy_doc: bool) -> Parser<'static> {
    Parser::Word { is_legacy_doc }
}

/// The PDF parser: `pdf-extract` then `lopdf`, Markdown-post-processed.
pub fn pdf_parser(store: &dyn ObjectStore) -> Parser<'_> {
    Parser::Pipeline(vec![Parser::Pdf, markdown_parser(store)])
}

/// The Image parser: upload bytes, emit a Markdown image reference, keep the
/// base64 payload in the image map.
pub fn image_parser(store: &dyn ObjectStore) -> Parser<'_> {
    Parser::Image(store)
}

/// Dispatches a file kind to its parser. The only place that inspects file
/// kind; parsers themselves are kind-agnostic once chosen. Returns
/// `UnsupportedKind` for anything not in the table (§4.3, §7).
pub fn dispatch<'a>(kind: FileKind, store: &'a dyn ObjectStore) -> Result<Parser<'a>> {
    match kind {
        FileKind::Txt => Ok(Parser::Text),
        FileKind::Markdown => Ok(markdown_parser(store)),
        FileKind::Doc => Ok(word_parser(true)),
        FileKind::Docx => Ok(word_parser(false)),
        FileKind::Pdf => Ok(pdf_parser(store)),
        FileKind::Csv => Ok(Parser::Csv),
        FileKind::Xls | FileKind::Xlsx => Ok(Parser::Spreadsheet),
        FileKind::Image => Ok(image_parser(store)),
        FileKind::Url => Err(crate::error::Error::internal(
            "URL requests are handled by parse_url, not the byte dispatcher",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::object_store::Base64ObjectStore;

    #[tokio::test]
    async fn first_success_skips_failing_and_empty_stages() {
        let parser = Parser::FirstSuccess(vec![
            Parser::Word {
                is_legacy_doc: false,
            },
            Parser::Text,
        ]);
        // docx-rs fails on arbitrary bytes, but Word's own bottom-of-chain
        // plain-text fallback already makes this stage succeed.
        let doc = parser.parse_into_text(b"hello").await.unwrap();
        assert_eq!(doc.content, "hello");
    }

    #[tokio::test]
    async fn pipeline_threads_output_and_merges_images() {
        let store = Base64ObjectStore;
        let parser = markdown_parser(&store);
        let input = "|h1|h2|\n|---|---|\n|a|b|\n\n![x](data:image/png;base64,aGVsbG8=)";
        let doc = parser.parse_into_text(input.as_bytes()).await.unwrap();
        assert!(doc.content.contains("| h1 | h2 |"));
        assert_eq!(doc.images.len(), 1);
    }

    #[test]
    fn dispatcher_maps_known_extensions() {
        assert_eq!(FileKind::from_extension("md"), Some(FileKind::Markdown));
        assert_eq!(FileKind::from_extension("PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_extension("unknown"), None);
    }
}
