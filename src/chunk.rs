//! Bounded text chunking.
//!
//! Splits extracted document text into contiguous, non-overlapping pieces
//! of at most `max_chars` characters, one completion call each. Splits are
//! positional only: a word or sentence may straddle two chunks, an accepted
//! tradeoff that keeps reassembly exact.

/// Split `text` into ordered slices of at most `max_chars` characters.
///
/// Pure function of its input: same text and budget, same chunks. Cuts land
/// on `char` boundaries so multi-byte sequences are never split, and
/// concatenating the returned slices reconstructs `text` byte-for-byte.
/// Empty input yields no chunks; whitespace-only chunks are the caller's
/// concern, not the chunker's.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
