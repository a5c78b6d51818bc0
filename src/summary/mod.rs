// Extractive summarization — sentence segmentation, term-frequency scoring,
// and top-k selection, behind a swappable Summarizer trait.

pub mod frequency;
pub mod heuristic;
pub mod rate_limiter;
pub mod remote;
pub mod score;
pub mod segment;
pub mod select;
pub mod stop_words;
pub mod traits;
pub mod transcript;

pub use heuristic::{summarize, HeuristicSummarizer};
pub use traits::Summarizer;

/// Returned instead of a summary when the input is too short or has no
/// usable sentences.
pub const NOT_ENOUGH_CONTENT: &str = "Not enough content to summarize.";

/// Inputs whose trimmed length is below this many characters are not summarized.
pub const MIN_INPUT_CHARS: usize = 80;

/// Segments at or below this many characters are discarded.
pub const MIN_SENTENCE_CHARS: usize = 30;

/// Default sentence budget for chat transcript summaries.
pub const DEFAULT_CHAT_SENTENCES: usize = 6;

/// Default sentence budget for document summaries.
pub const DEFAULT_DOCUMENT_SENTENCES: usize = 7;

/// True when `text` is too short to be worth summarizing.
pub fn below_minimum(text: &str) -> bool {
    text.trim().chars().count() < MIN_INPUT_CHARS
}
