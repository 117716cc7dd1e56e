//! Local summary and keyword generator.
//!
//! Shared by every non-remote tier. Deterministic and offline: the summary is
//! the first sentence of the text and the tags are its first distinct long
//! words.

use once_cell::sync::Lazy;
use regex::Regex;

use clipper_core::{defaults, pad_with_fillers, RemoteAnnotation};

/// Sentence end: terminal punctuation followed by whitespace.
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.?!]\s").expect("valid sentence end regex"));

/// Lowercase alphabetic words long enough to be useful as tags.
static KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b[a-z]{{{},}}\b", defaults::TAG_MIN_WORD_LEN))
        .expect("valid keyword regex")
});

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to `max` characters, appending the ellipsis when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max).collect();
    cut.push_str(defaults::SUMMARY_ELLIPSIS);
    cut
}

/// First sentence of `text`, capped at the summary length.
///
/// Without a sentence boundary the whole (capped) text is used.
pub fn summarize(text: &str) -> String {
    let text = text.trim();
    let first = match SENTENCE_END.find(text) {
        // The punctuation is one ASCII byte.
        Some(m) => &text[..m.start() + 1],
        None => text,
    };
    truncate_chars(first, defaults::SUMMARY_MAX_CHARS)
}

/// Up to [`defaults::MAX_TAGS`] distinct keywords in order of first
/// appearance. Not padded.
pub fn keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tags: Vec<String> = Vec::new();
    for m in KEYWORD.find_iter(&lowered) {
        if tags.len() >= defaults::MAX_TAGS {
            break;
        }
        let word = m.as_str();
        if !tags.iter().any(|t| t == word) {
            tags.push(word.to_string());
        }
    }
    tags
}

/// Keywords padded with fillers up to [`defaults::MIN_TAGS`].
pub fn tags(text: &str) -> Vec<String> {
    let mut tags = keywords(text);
    pad_with_fillers(&mut tags, defaults::MIN_TAGS);
    tags
}

/// Full heuristic annotation of already-normalized text.
pub fn annotate(text: &str) -> RemoteAnnotation {
    RemoteAnnotation {
        summary: summarize(text),
        tags: tags(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(normalize_text("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_text(" \n "), "");
    }

    #[test]
    fn test_summary_is_first_sentence() {
        assert_eq!(
            summarize("This is a test. Extra detail follows."),
            "This is a test."
        );
        assert_eq!(summarize("Really? Yes."), "Really?");
    }

    #[test]
    fn test_summary_without_boundary_uses_text() {
        assert_eq!(summarize("no punctuation here"), "no punctuation here");
        assert_eq!(summarize("ends with dot."), "ends with dot.");
    }

    #[test]
    fn test_summary_truncated_past_limit() {
        let long = "word ".repeat(60);
        let summary = summarize(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), defaults::SUMMARY_MAX_CHARS + 3);
    }

    #[test]
    fn test_summary_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), defaults::SUMMARY_MAX_CHARS + 3);
    }

    #[test]
    fn test_keywords_unique_in_order() {
        let kw = keywords("Rust rust tokio is fast and tokio is async runtime glue");
        assert_eq!(kw, vec!["rust", "tokio", "fast", "async", "runtime"]);
    }

    #[test]
    fn test_keywords_skip_short_and_numeric() {
        assert_eq!(keywords("a an the 1234 abc"), Vec::<String>::new());
    }

    #[test]
    fn test_tags_padded_with_unique_fillers() {
        assert_eq!(tags("This is a test."), vec!["this", "test", "note"]);
        assert_eq!(tags("a note"), vec!["note", "clip", "snippet"]);
        assert_eq!(tags(""), vec!["note", "clip", "snippet"]);
    }

    #[test]
    fn test_annotate_bounds() {
        let a = annotate("This is a test. Extra detail follows.");
        assert_eq!(a.summary, "This is a test.");
        assert!((defaults::MIN_TAGS..=defaults::MAX_TAGS).contains(&a.tags.len()));
    }
}
