//! Spreadsheet parser (xls/xlsx): iterates sheets in order, drops fully-empty
//! rows, omits missing cells, and otherwise behaves exactly like the CSV
//! parser — offsets are continuous across all sheets.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};

use crate::document::Chunk;
use crate::error::{Error, Result};

pub fn parse_to_chunks(bytes: &[u8]) -> Result<Vec<Chunk>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).map_err(|e| Error::parse_failure("spreadsheet", e.to_string()))?;

    let mut chunks = Vec::new();
    let mut offset = 0usize;

    let sheet_names = workbook.sheet_names().to_vec();
    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(sheet = %sheet_name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();

        for row in rows {
            if row.iter().all(|c| matches!(c, Data::Empty)) {
                continue;
            }

            let mut parts = Vec::new();
            for (i, cell) in row.iter().enumerate() {
                if matches!(cell, Data::Empty) {
                    continue;
                }
                let col = headers.get(i).map(|s| s.as_str()).unwrap_or("");
                parts.push(format!("{}: {}", col.trim(), cell_to_string(cell).trim()));
            }
            if parts.is_empty() {
                continue;
            }

            let rendered = format!("{}\n", parts.join(", "));
            let len = rendered.chars().count();
            chunks.push(Chunk::new(chunks.len(), rendered, offset, offset + len));
            offset += len;
        }
    }

    Ok(chunks)
}

/// Renders every sheet's rows and concatenates the text, for use where a
/// spreadsheet stage sits inside a [`crate::parsing::Parser`] combinator
/// rather than as the top-level entry point that builds chunks directly.
pub fn render_to_text(bytes: &[u8]) -> Result<String> {
    Ok(parse_to_chunks(bytes)?
        .into_iter()
        .map(|c| c.content)
        .collect())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}
