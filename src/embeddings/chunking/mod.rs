
use serde::{Deserialize, Serialize};
use tracing::debug;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Configuration for passage chunking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Passage length, in characters, past which a new passage is started
    pub chunk_size: usize,
    /// Approximate overlap in characters carried into the next passage.
    /// Converted to words at five characters per word.
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap_size: 50,
        }
    }
}

impl ChunkingConfig {
    /// Number of trailing words copied from a closed passage into the next one
    #[inline]
    pub const fn overlap_words(&self) -> usize {
        self.overlap_size / 5
    }
}

/// Split extracted document text into overlapping, size-bounded passages.
///
/// Sentences are never split, so a single sentence longer than
/// `chunk_size` becomes a passage of its own.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len > config.chunk_size && !current.is_empty() {
            let closed = current.trim().to_string();
            let seed = trailing_words(&closed, config.overlap_words());

            current = if seed.is_empty() {
                sentence.trim_start().to_string()
            } else {
                format!("{} {}", seed, sentence.trim_start())
            };
            current_len = current.chars().count();

            if !closed.is_empty() {
                chunks.push(closed);
            }
        } else {
            current.push_str(sentence);
            current_len += sentence_len;
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }

    debug!(
        "Chunked {} characters into {} passages",
        text.len(),
        chunks.len()
    );

    chunks
}

/// Split text into sentence-like units ending in one or more of `. ! ?`.
///
/// Text after the final terminator is kept as a last unit, and text without
/// any terminator is returned as a single unit.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }

        // Absorb runs such as "?!" or "..." into the same sentence
        while let Some(&(_, next)) = chars.peek() {
            if SENTENCE_TERMINATORS.contains(&next) {
                chars.next();
            } else {
                break;
            }
        }

        let end = chars.peek().map_or(text.len(), |&(i, _)| i);
        sentences.push(&text[start..end]);
        start = end;
    }

    if start < text.len() && !text[start..].trim().is_empty() {
        sentences.push(&text[start..]);
    }

    sentences
}

/// Take the last `count` whitespace-separated words of `text`
fn trailing_words(text: &str, count: usize) -> String {
    if count == 0 {
        return String::new();
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    words[words.len().saturating_sub(count)..].join(" ")
}
