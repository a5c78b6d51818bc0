// Heuristic extractive summarizer.
//
// segment -> term frequencies over the full text -> score each sentence ->
// keep the top k in reading order. Zero API calls, no state between calls.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::frequency::build_frequencies;
use super::score::score;
use super::segment::segment;
use super::select::{assemble, select_top, Sentence};
use super::stop_words::StopWords;
use super::traits::Summarizer;
use super::{below_minimum, NOT_ENOUGH_CONTENT};

/// Summarize `text` with the built-in stop-word list.
///
/// Never fails: short or sentence-less input yields [`NOT_ENOUGH_CONTENT`].
pub fn summarize(text: &str, max_sentences: usize) -> String {
    HeuristicSummarizer::default().summarize_text(text, max_sentences)
}

/// Extractive summarizer driven by average term frequency.
#[derive(Debug, Clone, Default)]
pub struct HeuristicSummarizer {
    stop_words: Arc<StopWords>,
}

impl HeuristicSummarizer {
    pub fn new(stop_words: StopWords) -> Self {
        Self {
            stop_words: Arc::new(stop_words),
        }
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Synchronous core of the summarizer.
    pub fn summarize_text(&self, text: &str, max_sentences: usize) -> String {
        if below_minimum(text) {
            return NOT_ENOUGH_CONTENT.to_string();
        }

        let sentences = segment(text);
        if sentences.is_empty() {
            return NOT_ENOUGH_CONTENT.to_string();
        }

        // Frequencies come from the whole text, including the fragments the
        // segmenter discarded.
        let freq = build_frequencies(text, &self.stop_words);

        let scored: Vec<Sentence> = sentences
            .into_iter()
            .enumerate()
            .map(|(index, content)| {
                let score = score(&content, &freq);
                Sentence {
                    index,
                    content,
                    score,
                }
            })
            .collect();

        let candidates = scored.len();
        let selected = select_top(scored, max_sentences);

        debug!(
            candidates,
            selected = selected.len(),
            vocabulary = freq.len(),
            "Built extractive summary"
        );

        assemble(&selected)
    }
}

#[async_trait]
impl Summarizer for HeuristicSummarizer {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    /// Runs on the blocking pool; a long group history is CPU-bound work.
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String> {
        let summarizer = self.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || summarizer.summarize_text(&text, max_sentences))
            .await
            .context("Summarizer task failed")
    }
}
