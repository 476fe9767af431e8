//! Text processing for TTS: sentence splitting and chunk packing.

pub mod chunker;
pub mod segmenter;

pub use chunker::{ChunkError, chunk_text};

/// Number of characters shown when a chunk is previewed in logs.
pub const PREVIEW_CHARS: usize = 40;

/// A chunk of text ready for TTS processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk index within the sequence (0-based)
    pub chunk_id: usize,
    /// The text content
    pub text: String,
    /// Whether this chunk is a fixed-size piece of an oversized sentence
    pub hard_split: bool,
}

impl TextChunk {
    /// Create a new text chunk.
    pub fn new(chunk_id: usize, text: String, hard_split: bool) -> Self {
        Self {
            chunk_id,
            text,
            hard_split,
        }
    }

    /// 1-based position, used for file names and user-facing messages.
    pub fn ordinal(&self) -> usize {
        self.chunk_id + 1
    }

    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Short preview of the text for log lines.
    pub fn preview(&self) -> String {
        preview(&self.text, PREVIEW_CHARS)
    }
}

/// Truncate `text` to `max` characters, appending `...` when something was cut.
pub fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
