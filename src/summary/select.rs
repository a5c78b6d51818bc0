// Top-K selection.
//
// Two-phase: rank by score (descending, earliest index wins ties), keep the
// first k, then put the survivors back into reading order.

use std::cmp::Ordering;

/// A segmented sentence with its position in the source text and its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// 0-based position among the segmented sentences.
    pub index: usize,
    pub content: String,
    pub score: f64,
}

/// Pick the `k` highest-scoring sentences and return them in original order.
///
/// Ties are broken by index explicitly so the result doesn't depend on the
/// input order or on sort stability.
pub fn select_top(mut sentences: Vec<Sentence>, k: usize) -> Vec<Sentence> {
    sentences.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });
    sentences.truncate(k.min(sentences.len()));
    sentences.sort_by_key(|s| s.index);
    sentences
}

/// Join the selected sentences with single spaces.
pub fn assemble(selected: &[Sentence]) -> String {
    selected
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
