//! Splits document text into overlapping chunks for full-text retrieval.

/// Target chunk length in characters
pub const CHUNK_SIZE: usize = 1200;

/// Characters shared between consecutive chunks
pub const CHUNK_OVERLAP: usize = 200;

/// Split `text` into chunks of at most `size` characters.
///
/// Chunks end on whitespace when one exists in the second half of the window,
/// and the next chunk starts roughly `overlap` characters earlier, snapped
/// forward to a word start.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + size).min(len);
        if end < len {
            if let Some(ws) = (start + size / 2..end)
                .rev()
                .find(|&i| chars[i].is_whitespace())
            {
                end = ws;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= len {
            break;
        }

        let mut next = end.saturating_sub(overlap).max(start + 1);
        while next < end && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        start = next;
    }

    chunks
}
