//! Fixed-window line chunker.
//!
//! Splits file text into [`Chunk`]s of at most `window` consecutive lines.
//! Windows never overlap and only the last one may be shorter, so joining
//! the windows' lines back together reproduces the file's line sequence.
//!
//! Chunk ids are derived from the file path and the window index, which
//! makes re-indexing the same content produce the same ids.

use crate::models::Chunk;

/// Lines per chunk unless `[chunking].window_lines` says otherwise.
pub const DEFAULT_WINDOW_LINES: usize = 120;

/// Split text into newline-joined windows of at most `window` lines.
///
/// Empty text yields no windows. A `window` of zero is treated as one.
pub fn chunk_lines(text: &str, window: usize) -> Vec<String> {
    let window = window.max(1);
    let lines: Vec<&str> = text.lines().collect();
    lines.chunks(window).map(|w| w.join("\n")).collect()
}

/// Chunk one file's text, tagging every window with its repository and path.
pub fn chunk_file(repo_id: &str, file_path: &str, text: &str, window: usize) -> Vec<Chunk> {
    chunk_lines(text, window)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, text)| Chunk {
            repo_id: repo_id.to_string(),
            file_path: file_path.to_string(),
            chunk_index,
            text,
        })
        .collect()
}

/// Decode bytes as UTF-8, dropping invalid sequences instead of failing.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for piece in bytes.utf8_chunks() {
        out.push_str(piece.valid());
    }
    out
}
