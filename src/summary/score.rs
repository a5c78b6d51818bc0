// Sentence scoring — average term frequency of a sentence's tokens.
//
// Unlike frequency building, every token counts toward the denominator,
// stop-words and short tokens included. Sentences padded with filler words
// score lower than dense ones.

use super::frequency::{tokenize, TermFrequencyTable};

/// Score a sentence against the frequency table. Empty sentences score 0.
pub fn score(sentence: &str, freq: &TermFrequencyTable) -> f64 {
    let tokens = tokenize(sentence);
    let total: u64 = tokens
        .iter()
        .map(|t| freq.get(t).copied().unwrap_or(0) as u64)
        .sum();
    total as f64 / tokens.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, u32)]) -> TermFrequencyTable {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_empty_sentence_scores_zero() {
        let freq = table(&[("dog", 3)]);
        assert_eq!(score("", &freq), 0.0);
        assert_eq!(score("?!...", &freq), 0.0);
    }

    #[test]
    fn test_unknown_tokens_count_as_zero() {
        let freq = table(&[("dog", 2), ("time", 2)]);
        // the(0) dog(2) barked(0) every(0) time(2) = 4 / 5
        let s = score("The dog barked every time.", &freq);
        assert!((s - 0.8).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_stop_words_dilute_the_average() {
        let freq = table(&[("graphs", 4)]);
        let dense = score("Graphs graphs.", &freq);
        let padded = score("The graphs and the graphs.", &freq);
        assert!(dense > padded);
    }
}
