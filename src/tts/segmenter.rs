//! Text segmentation into synthesis units.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Boundary markers in priority order: newline runs, sentence punctuation
/// followed by a space, full-width period and question mark, a bare space, and
/// terminal punctuation at the very end of the text.
pub const DEFAULT_SPLIT_PATTERN: &str = r"\n+|\. |\? |! |。|？| |[.?!。？]+\s*\z";

/// A compiled boundary pattern.
///
/// Matching is leftmost-first: at each position the earliest alternative wins
/// and matches never overlap, so identical input always yields identical units.
#[derive(Clone)]
pub struct SplitPattern {
    regex: Regex,
}

impl SplitPattern {
    /// Compile a custom boundary pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { regex: Regex::new(pattern)? })
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Split `text` into trimmed, non-empty units in text order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.regex.split(text).map(str::trim).filter(|unit| !unit.is_empty()).map(str::to_string).collect()
    }
}

static DEFAULT: LazyLock<SplitPattern> = LazyLock::new(|| SplitPattern::new(DEFAULT_SPLIT_PATTERN).expect("default split pattern is valid"));

impl Default for SplitPattern {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl fmt::Debug for SplitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SplitPattern").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<String> {
        SplitPattern::default().segment(text)
    }

    #[test]
    fn test_sentence_punctuation_is_consumed() {
        assert_eq!(segment("Hello. World? Yes!"), vec!["Hello", "World", "Yes"]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(segment("").is_empty());
        assert!(segment("   \n\n  ").is_empty());
    }

    #[test]
    fn test_newline_runs() {
        assert_eq!(segment("first\n\n\nsecond\nthird"), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_full_width_marks() {
        assert_eq!(segment("你好。再见？好"), vec!["你好", "再见", "好"]);
    }

    #[test]
    fn test_bare_space_splits_words() {
        assert_eq!(segment("Hi there. How are you?"), vec!["Hi", "there", "How", "are", "you"]);
    }

    #[test]
    fn test_punctuation_inside_words_is_kept() {
        // No space after the period, so it is not a boundary
        assert_eq!(segment("v1.0"), vec!["v1.0"]);
        assert_eq!(segment("Wait... what"), vec!["Wait..", "what"]);
    }

    #[test]
    fn test_deterministic() {
        let text = "One. Two!\nThree? Four。";
        assert_eq!(segment(text), segment(text));
    }
}
