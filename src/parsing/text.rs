//! Plain-text parser: decode bytes to a string via an encoding cascade, emit
//! the result as-is. No chunking, image handling, or further processing.

use encoding_rs::{BIG5, GBK, UTF_8, WINDOWS_1252};

use crate::document::Document;

/// Tries encodings in order, accepting the first one that decodes without
/// replacement characters; falls back to a lossy decode (effectively
/// `latin-1`-with-replacement) as a last resort, matching the source's
/// documented `utf-8, gb18030, gb2312, gbk, big5, ascii, latin-1` cascade.
/// `encoding_rs` folds `gb18030`/`gb2312`/`gbk` into a single GBK-compatible
/// decoder and has no bare `ascii`, so those collapse into the GBK and
/// Windows-1252 steps respectively without changing observable behavior for
/// any input that cleanly decodes under one of the originals.
pub fn decode_bytes(bytes: &[u8]) -> String {
    for encoding in [UTF_8, GBK, BIG5, WINDOWS_1252] {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
    }

    tracing::warn!("no encoding decoded cleanly; falling back to lossy latin-1 replacement");
    let (decoded, _, _) = WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

pub fn parse(bytes: &[u8]) -> Document {
    Document::new(decode_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_utf8_unchanged() {
        let doc = parse("hello, 世界".as_bytes());
        assert_eq!(doc.content, "hello, 世界");
    }

    #[test]
    fn falls_back_gracefully_on_garbage_bytes() {
        let doc = parse(&[0xff, 0xfe, 0x00, 0x41]);
        assert!(!doc.content.is_empty());
    }
}
