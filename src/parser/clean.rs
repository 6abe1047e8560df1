//! Message text cleaning.
//!
//! Cleaning feeds the word counter and the sampler: URLs go first, then each
//! whitespace token is stripped of surrounding ASCII punctuation,
//! lower-cased, and dropped when it is a stop-word or shorter than three
//! characters.

use regex::Regex;

use crate::lexicon::Lexicon;

/// ASCII punctuation stripped from token edges.
const ASCII_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Minimum character length a cleaned token must keep.
const MIN_TOKEN_CHARS: usize = 3;

/// Holds the compiled URL pattern so it is built once per parser.
#[derive(Debug)]
pub struct TextCleaner {
    url_pattern: Regex,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            url_pattern: Regex::new(r"https?://\S+|www\.\S+").expect("static regex"),
        }
    }

    /// Removes http/https/www URLs.
    pub fn strip_urls(&self, text: &str) -> String {
        self.url_pattern.replace_all(text, "").into_owned()
    }

    /// Produces the cleaned view of a message body.
    ///
    /// The result may be empty; the parser still emits such records because
    /// emoji-only messages carry signal for the emoji counter.
    pub fn clean(&self, text: &str, lexicon: &Lexicon) -> String {
        let text = self.strip_urls(text);
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let kept: Vec<String> = text
            .split_whitespace()
            .map(normalize_word)
            .filter(|word| {
                !word.is_empty()
                    && word.chars().count() >= MIN_TOKEN_CHARS
                    && !lexicon.is_stopword(word)
            })
            .collect();

        kept.join(" ")
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Strips surrounding ASCII punctuation and lower-cases a token.
pub fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| ASCII_PUNCTUATION.contains(c))
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::from_parts(["the", "and", "you"], [])
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("Hello!"), "hello");
        assert_eq!(normalize_word("(WORLD)"), "world");
        assert_eq!(normalize_word("don't"), "don't");
        assert_eq!(normalize_word("..."), "");
    }

    #[test]
    fn test_clean_drops_stopwords_and_short_tokens() {
        let cleaner = TextCleaner::new();
        let out = cleaner.clean("You and the dog ran to me", &lexicon());
        assert_eq!(out, "dog ran");
    }

    #[test]
    fn test_clean_strips_urls() {
        let cleaner = TextCleaner::new();
        let out = cleaner.clean("look https://example.com/x?q=1 here www.test.org now", &lexicon());
        assert_eq!(out, "look here now");
    }

    #[test]
    fn test_clean_empty_and_punctuation_only() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("", &lexicon()), "");
        assert_eq!(cleaner.clean("!!! ??? ...", &lexicon()), "");
    }

    #[test]
    fn test_clean_counts_characters_not_bytes() {
        let cleaner = TextCleaner::new();
        // Three Cyrillic characters are six bytes but still one valid token.
        assert_eq!(cleaner.clean("мир дом кот", &lexicon()), "мир дом кот");
        // A single emoji is one character and gets dropped from the cleaned view.
        assert_eq!(cleaner.clean("🔥", &lexicon()), "");
    }

    #[test]
    fn test_clean_preserves_order() {
        let cleaner = TextCleaner::new();
        let out = cleaner.clean("zebra apple mango", &lexicon());
        assert_eq!(out, "zebra apple mango");
    }
}
