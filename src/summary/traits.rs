// Summarizer trait — the swap-ready abstraction.
//
// The heuristic extractive summarizer is always available and never fails.
// A remote language-model summarizer can be selected by configuration; it
// falls back to the heuristic one whenever the API can't be reached.

use anyhow::Result;
use async_trait::async_trait;

/// Trait for turning a chat transcript or document text into a summary.
///
/// Async because remote implementations make HTTP calls. Implementations
/// return the `NOT_ENOUGH_CONTENT` message for inputs that are too short,
/// rather than an error.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short identifier used in logs and status output.
    fn name(&self) -> &'static str;

    /// Summarize `text` into at most `max_sentences` sentences.
    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String>;
}
