//! Side-file vocabularies loaded once at process start.
//!
//! Two files live under the data directory:
//!
//! - `stopwords.txt` — one lower-cased token per line
//! - `system_message_patterns.json` — JSON array of case-insensitive
//!   substrings marking system/media notices (group joins, encryption
//!   banners, media placeholders, ...)
//!
//! Loading is forgiving: a missing or unreadable file logs a warning and the
//! corresponding set is simply empty, so analysis still runs (just without
//! stop-word removal or system filtering).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

/// Default directory holding the side files.
pub const DEFAULT_DATA_DIR: &str = "data";

const STOPWORDS_FILE: &str = "stopwords.txt";
const SYSTEM_MESSAGES_FILE: &str = "system_message_patterns.json";

/// Stop-words and system-message patterns shared by parser and stats.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    system_patterns: Vec<String>,
}

impl Lexicon {
    /// Loads both side files from `dir`, tolerating absence of either.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        let stopwords = match load_stopwords(&dir.join(STOPWORDS_FILE)) {
            Ok(set) => {
                info!(count = set.len(), "loaded stopwords");
                set
            }
            Err(e) => {
                warn!("failed to load stopwords: {e}. Proceeding without stop-word removal.");
                HashSet::new()
            }
        };

        let system_patterns = match load_system_patterns(&dir.join(SYSTEM_MESSAGES_FILE)) {
            Ok(patterns) => {
                info!(count = patterns.len(), "loaded system message patterns");
                patterns
            }
            Err(e) => {
                warn!("failed to load system message patterns: {e}");
                Vec::new()
            }
        };

        Self {
            stopwords,
            system_patterns,
        }
    }

    /// Builds a lexicon directly from in-memory parts. Used by tests.
    pub fn from_parts<S: Into<String>>(
        stopwords: impl IntoIterator<Item = S>,
        system_patterns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
            system_patterns: system_patterns
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
        }
    }

    /// Returns `true` when `word` (already lower-cased) is a stop-word.
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Returns `true` when the lower-cased message body contains any known
    /// system-message pattern.
    pub fn is_system_message(&self, lower_body: &str) -> bool {
        self.system_patterns
            .iter()
            .any(|pattern| lower_body.contains(pattern.as_str()))
    }

    /// Number of loaded stop-words.
    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }
}

fn load_stopwords(path: &Path) -> std::io::Result<HashSet<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect())
}

fn load_system_patterns(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    let patterns: Vec<String> = serde_json::from_str(&content)?;
    Ok(patterns.into_iter().map(|p| p.to_lowercase()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_parts() {
        let lex = Lexicon::from_parts(["The", "and"], ["created group"]);
        assert!(lex.is_stopword("the"));
        assert!(lex.is_stopword("and"));
        assert!(!lex.is_stopword("hello"));
        assert_eq!(lex.stopword_count(), 2);
    }

    #[test]
    fn test_system_message_matching() {
        let lex = Lexicon::from_parts::<&str>([], ["Messages and calls are end-to-end encrypted"]);
        assert!(lex.is_system_message("messages and calls are end-to-end encrypted. tap for info."));
        assert!(!lex.is_system_message("good morning everyone"));
    }

    #[test]
    fn test_load_missing_dir_is_empty() {
        let lex = Lexicon::load("/nonexistent/data/dir");
        assert_eq!(lex.stopword_count(), 0);
        assert!(!lex.is_system_message("anything"));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("stopwords.txt")).unwrap();
        writeln!(f, "the\nAND\n\n  for  ").unwrap();
        let mut f = std::fs::File::create(dir.path().join("system_message_patterns.json")).unwrap();
        write!(f, r#"["Created Group", "omitted media"]"#).unwrap();

        let lex = Lexicon::load(dir.path());
        assert_eq!(lex.stopword_count(), 3);
        assert!(lex.is_stopword("and"));
        assert!(lex.is_system_message("alice created group \"trip\""));
    }
}
