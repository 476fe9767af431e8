//! Text chunking for TTS processing.
//!
//! Sentences are packed greedily into chunks between `min_chars` and
//! `max_chars` characters. Lengths are counted in characters, not bytes.

use super::TextChunk;
use super::segmenter::split_into_sentences;
use thiserror::Error;

/// Default soft minimum chunk size in characters.
pub const DEFAULT_MIN_CHARS: usize = 50;

/// Default hard maximum chunk size in characters.
pub const DEFAULT_MAX_CHARS: usize = 100;

/// Chunking errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Invalid chunk bounds: min_chars={min}, max_chars={max} (need 0 < min <= max)")]
    InvalidBounds { min: usize, max: usize },
}

/// Split raw text into TTS-friendly chunks.
pub fn chunk_text(text: &str, min_chars: usize, max_chars: usize) -> Result<Vec<TextChunk>, ChunkError> {
    let sentences = split_into_sentences(text);
    pack(&sentences, min_chars, max_chars)
}

/// Pack sentences into chunks.
///
/// A sentence that already fits the bounds becomes its own chunk, an
/// oversized one is hard-split into `max_chars` pieces, and short ones are
/// accumulated (joined by a single space) until the accumulator reaches
/// `min_chars`. When the accumulator cannot absorb the next sentence it is
/// flushed even if it is still under `min_chars`. Whatever is left at the
/// end becomes the final chunk.
pub fn pack<S: AsRef<str>>(
    sentences: &[S],
    min_chars: usize,
    max_chars: usize,
) -> Result<Vec<TextChunk>, ChunkError> {
    if min_chars == 0 || max_chars == 0 || min_chars > max_chars {
        return Err(ChunkError::InvalidBounds {
            min: min_chars,
            max: max_chars,
        });
    }

    let mut packer = Packer::default();
    let mut i = 0;

    // `i` only advances once sentence `i` has been consumed.
    while i < sentences.len() {
        let sentence = sentences[i].as_ref();
        let len = char_len(sentence);

        if packer.cur.is_empty() {
            if len > max_chars {
                for piece in hard_split(sentence, max_chars) {
                    packer.emit(piece, true);
                }
            } else if len >= min_chars {
                packer.emit(sentence.to_string(), false);
            } else {
                packer.cur = sentence.to_string();
                packer.cur_len = len;
            }
            i += 1;
            continue;
        }

        let candidate_len = packer.cur_len + 1 + len;
        if candidate_len <= max_chars {
            packer.cur.push(' ');
            packer.cur.push_str(sentence);
            packer.cur_len = candidate_len;
            if packer.cur_len >= min_chars {
                packer.flush();
            }
            i += 1;
        } else {
            // Flushes even when under min_chars; the sentence is retried
            // against an empty accumulator on the next pass.
            packer.flush();
        }
    }

    packer.flush();
    Ok(packer.chunks)
}

#[derive(Default)]
struct Packer {
    chunks: Vec<TextChunk>,
    cur: String,
    cur_len: usize,
}

impl Packer {
    fn emit(&mut self, text: String, hard_split: bool) {
        let chunk_id = self.chunks.len();
        self.chunks.push(TextChunk::new(chunk_id, text, hard_split));
    }

    fn flush(&mut self) {
        if self.cur.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.cur);
        self.cur_len = 0;
        self.emit(text.trim().to_string(), false);
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Hard split text at exact character positions.
fn hard_split(text: &str, max_length: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_length)
        .map(|piece| piece.iter().collect())
        .collect()
}
