//! Shared byte-offset <-> char-offset mapping. Regex matches always land on
//! UTF-8 char boundaries, but the data model addresses text by *character*
//! offset (so CJK input chunks correctly), so every module that runs a regex
//! over content and then needs to report offsets goes through this.

/// `boundaries[i]` is the byte offset of the i-th char; the final entry is
/// `text.len()` (a sentinel for "end of string").
pub fn char_boundary_index(text: &str) -> Vec<usize> {
    let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    boundaries.push(text.len());
    boundaries
}

pub fn byte_to_char_offset(boundaries: &[usize], byte_pos: usize) -> usize {
    boundaries.binary_search(&byte_pos).unwrap_or_else(|i| i)
}
