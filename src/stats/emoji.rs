//! Emoji grapheme-cluster extraction.
//!
//! Emoji are counted from the *original* message text, cluster by cluster:
//! a base pictographic code point optionally combined with one following
//! non-spacing mark, symbol modifier, or skin-tone modifier
//! (`U+1F3FB..U+1F3FF`). "👍🏽👍🏽" therefore counts the toned thumbs-up twice,
//! and "👍🏽" never splits into a bare thumb plus a stray tone swatch.

use regex::Regex;

/// Low end of the skin-tone modifier block.
const SKIN_TONE_FIRST: char = '\u{1F3FB}';
/// High end of the skin-tone modifier block.
const SKIN_TONE_LAST: char = '\u{1F3FF}';

/// Holds the compiled emoji patterns.
#[derive(Debug)]
pub struct EmojiExtractor {
    runs: Regex,
    combining: Regex,
}

impl EmojiExtractor {
    pub fn new() -> Self {
        let runs = Regex::new(
            "[\u{1F300}-\u{1F5FF}\
              \u{1F600}-\u{1F64F}\
              \u{1F680}-\u{1F6FF}\
              \u{1F1E0}-\u{1F1FF}\
              \u{2700}-\u{27BF}\
              \u{2600}-\u{26FF}\
              \u{FE00}-\u{FE0F}\
              \u{1F900}-\u{1F9FF}]+",
        )
        .expect("static regex");

        let combining = Regex::new(r"[\p{Mn}\p{Sk}]").expect("static regex");

        Self { runs, combining }
    }

    /// Extracts emoji clusters in order of occurrence, one entry per
    /// occurrence (duplicates included).
    pub fn extract(&self, text: &str) -> Vec<String> {
        let mut clusters = Vec::new();

        for run in self.runs.find_iter(text) {
            let chars: Vec<char> = run.as_str().chars().collect();
            let mut i = 0;
            while i < chars.len() {
                let mut cluster = String::new();
                cluster.push(chars[i]);

                if i + 1 < chars.len() && self.is_modifier(chars[i + 1]) {
                    cluster.push(chars[i + 1]);
                    i += 1;
                }

                clusters.push(cluster);
                i += 1;
            }
        }

        clusters
    }

    /// Removes every emoji run from the text. Used by the sampler so the
    /// LLM sees words, not pictographs.
    pub fn strip(&self, text: &str) -> String {
        self.runs.replace_all(text, "").into_owned()
    }

    fn is_modifier(&self, c: char) -> bool {
        if (SKIN_TONE_FIRST..=SKIN_TONE_LAST).contains(&c) {
            return true;
        }
        let mut buf = [0u8; 4];
        self.combining.is_match(c.encode_utf8(&mut buf))
    }
}

impl Default for EmojiExtractor {
    fn default() -> Self {
        Self::new()
    }
}
