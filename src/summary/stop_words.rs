// Stop-word sets — injectable so summaries can be localized or tested
// against alternate lists.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use stop_words::{get, LANGUAGE};

/// The built-in list used for chat and document summaries.
const BUILTIN: &[&str] = &[
    "the", "is", "are", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "as", "by",
    "at", "this", "that", "it", "be", "was", "were", "from", "but", "not", "have", "has", "had",
    "you", "we", "they", "i", "he", "she", "them", "his", "her", "our", "your", "their",
];

/// A set of lower-case tokens excluded from the term frequency table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    /// The fixed 40-word list of common English function words.
    pub fn builtin() -> Self {
        BUILTIN.iter().map(|w| w.to_string()).collect()
    }

    /// The full English list shipped with the `stop-words` crate.
    pub fn english() -> Self {
        get(LANGUAGE::English)
            .into_iter()
            .map(|w| w.to_lowercase())
            .collect()
    }

    /// An empty set. Every token longer than two characters is counted.
    pub fn none() -> Self {
        Self(HashSet::new())
    }

    /// Load a list from a text file: one word per line, blank lines and
    /// lines starting with `#` are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read stop-word list at {}", path.display()))?;
        Ok(parse_list(&contents))
    }

    /// Resolve a configuration value: `builtin`, `english`, or a file path.
    pub fn from_setting(setting: &str) -> Result<Self> {
        match setting.trim() {
            "" | "builtin" => Ok(Self::builtin()),
            "english" => Ok(Self::english()),
            "none" => Ok(Self::none()),
            path => Self::from_file(Path::new(path)),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for StopWords {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FromIterator<String> for StopWords {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_list(contents: &str) -> StopWords {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_forty_words() {
        let words = StopWords::builtin();
        assert_eq!(words.len(), 40);
        assert!(words.contains("the"));
        assert!(words.contains("their"));
        assert!(!words.contains("recursion"));
    }

    #[test]
    fn test_english_is_larger_than_builtin() {
        let english = StopWords::english();
        assert!(english.len() > StopWords::builtin().len());
        assert!(english.contains("the"));
    }

    #[test]
    fn test_parse_list_skips_comments_and_blanks() {
        let words = parse_list("# Spanish\nel\n\nLa\n  los  \n");
        assert_eq!(words.len(), 3);
        assert!(words.contains("la"));
        assert!(words.contains("los"));
    }

    #[test]
    fn test_from_setting_missing_file_fails() {
        assert!(StopWords::from_setting("/nonexistent/stopwords.txt").is_err());
        assert_eq!(StopWords::from_setting("builtin").unwrap(), StopWords::builtin());
    }
}
