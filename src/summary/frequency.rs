// Term frequency model.
//
// Built once per summarization call over the full input text. Only tokens
// longer than two characters that aren't stop-words are counted; the scorer
// looks tokens up here and treats anything missing as zero.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;

use super::stop_words::StopWords;

/// Token → occurrence count over an entire text.
pub type TermFrequencyTable = HashMap<String, u32>;

/// Tokens this short or shorter never enter the frequency table.
const MAX_IGNORED_TOKEN_LEN: usize = 2;

// Literal pattern, checked by the tests below.
static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

/// Lower-case `text`, blank out everything that isn't `[a-z0-9]` or
/// whitespace, and split on whitespace. Empty tokens never appear.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let cleaned = NON_ALPHANUMERIC.replace_all(&lower, " ");
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Count every content token in `text`.
pub fn build_frequencies(text: &str, stop_words: &StopWords) -> TermFrequencyTable {
    let mut freq = TermFrequencyTable::new();
    for token in tokenize(text) {
        if token.len() <= MAX_IGNORED_TOKEN_LEN || stop_words.contains(&token) {
            continue;
        }
        *freq.entry(token).or_insert(0) += 1;
    }
    freq
}
