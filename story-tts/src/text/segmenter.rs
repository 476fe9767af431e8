//! Sentence splitting on terminal punctuation (ASCII, full-width and CJK).

use once_cell::sync::Lazy;
use regex::Regex;

/// A sentence terminator plus any whitespace that follows it.
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?．！？。]\s*").expect("sentence terminator pattern is valid"));

/// Flatten line breaks and trim the text before splitting.
pub fn normalize(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Split text into sentences.
///
/// Each sentence keeps its terminating punctuation. Whitespace after a
/// terminator is dropped, every piece is trimmed, and empty pieces are
/// discarded. Empty or whitespace-only input gives an empty vector.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let text = normalize(text);
    if text.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END.find_iter(&text) {
        push_trimmed(&mut sentences, &text[start..m.end()]);
        start = m.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        sentences.push(piece.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(split_into_sentences("").is_empty());
        assert!(split_into_sentences("   ").is_empty());
        assert!(split_into_sentences("\n\n \n").is_empty());
    }

    #[test]
    fn test_split_ascii_punctuation() {
        let sentences = split_into_sentences("Hello. How are you? Fine!");
        assert_eq!(sentences, vec!["Hello.", "How are you?", "Fine!"]);
    }

    #[test]
    fn test_split_without_space_after_terminator() {
        let sentences = split_into_sentences("One.Two.Three");
        assert_eq!(sentences, vec!["One.", "Two.", "Three"]);
    }

    #[test]
    fn test_split_cjk_punctuation() {
        let sentences = split_into_sentences("今天天气很好。我们去公园吧！你去吗？好的．");
        assert_eq!(
            sentences,
            vec!["今天天气很好。", "我们去公园吧！", "你去吗？", "好的．"]
        );
    }

    #[test]
    fn test_newlines_become_spaces() {
        let sentences = split_into_sentences("First line\ncontinues here. Second\nsentence.");
        assert_eq!(
            sentences,
            vec!["First line continues here.", "Second sentence."]
        );
    }

    #[test]
    fn test_trailing_fragment_kept() {
        let sentences = split_into_sentences("Done. and a fragment without end");
        assert_eq!(sentences, vec!["Done.", "and a fragment without end"]);
    }

    #[test]
    fn test_repeated_terminators_split_individually() {
        let sentences = split_into_sentences("Wait... what?!");
        assert_eq!(sentences, vec!["Wait.", ".", ".", "what?", "!"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a\nb  \n"), "a b");
    }
}
