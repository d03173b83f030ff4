//! CSV parser: bypasses the general chunking engine entirely. Each row
//! becomes its own chunk, rendered as `col: value, col: value\n`, with
//! offsets computed directly from the rendered rows.

use crate::document::Chunk;
use crate::error::Result;
use crate::parsing::text::decode_bytes;

pub fn parse_to_chunks(bytes: &[u8]) -> Result<Vec<Chunk>> {
    let text = decode_bytes(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map(|h| h.iter().map(|s| s.trim().to_string()).collect())
        .unwrap_or_default();

    let mut chunks = Vec::new();
    let mut offset = 0usize;

    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed CSV row");
                continue;
            }
        };

        let rendered = render_row(&headers, &record);
        let len = rendered.chars().count();
        let chunk = Chunk::new(chunks.len(), rendered, offset, offset + len);
        offset += len;
        chunks.push(chunk);
    }

    Ok(chunks)
}

fn render_row(headers: &[String], record: &csv::StringRecord) -> String {
    let mut parts = Vec::new();
    for (i, value) in record.iter().enumerate() {
        let col = headers.get(i).map(|s| s.as_str()).unwrap_or("");
        parts.push(format!("{}: {}", col.trim(), value.trim()));
    }
    format!("{}\n", parts.join(", "))
}

/// Renders every row's text and concatenates it, for use where a CSV stage
/// sits inside a [`crate::parsing::Parser`] combinator (e.g. `FirstSuccess`)
/// rather than as the top-level entry point that builds chunks directly.
pub fn render_to_text(bytes: &[u8]) -> String {
    match parse_to_chunks(bytes) {
        Ok(chunks) => chunks.into_iter().map(|c| c.content).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "CSV render_to_text failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_chunk_per_row_with_precise_offsets() {
        let chunks = parse_to_chunks(b"a,b\n1,2\n3,4\n").unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "a: 1, b: 2\n");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 11));
        assert_eq!(chunks[1].content, "a: 3, b: 4\n");
        assert_eq!((chunks[1].start, chunks[1].end), (11, 22));
    }
}
