// Chat transcripts — turning a group's message history into summarizer input.

use crate::db::models::{ChatMessage, MessageKind};

/// Returned instead of a summary when a group has no chat messages yet.
pub const NO_MESSAGES: &str = "No messages to summarize.";

/// Join the text of a group's chat messages, oldest first, with single
/// spaces. File announcements are skipped. Returns `None` when there is
/// nothing to summarize.
pub fn transcript(messages: &[ChatMessage]) -> Option<String> {
    let texts: Vec<&str> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Text)
        .map(|m| m.text.as_str())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}
