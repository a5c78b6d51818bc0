// Colored terminal output for summaries, study groups and database stats.
//
// main.rs delegates all terminal formatting here.

use colored::Colorize;

use crate::db::models::{ChatMessage, DbStats, SavedSummary, StudyGroup};
use crate::summary::NOT_ENOUGH_CONTENT;

/// Print one summary under a heading. Canned "not enough content" results
/// are shown dimmed so they don't read like a real summary.
pub fn display_summary(title: &str, summary: &str) {
    println!("\n{}", format!("=== {title} ===").bold());
    if summary == NOT_ENOUGH_CONTENT {
        println!("  {}", summary.dimmed());
    } else {
        println!("{summary}");
    }
}

/// Print extracted document text with a character count.
pub fn display_extracted(path: &str, text: &str) {
    println!(
        "{} {} ({} chars)",
        "Extracted".green().bold(),
        path,
        text.chars().count()
    );
    println!("{text}");
}

/// Print the group a chat summary was generated for and how much it covered.
pub fn display_group_summary(group: &StudyGroup, messages: &[ChatMessage], saved: &SavedSummary) {
    println!(
        "\n{}",
        format!("=== Summary for \"{}\" ===", group.name).bold()
    );
    println!(
        "  {} messages from {} members",
        messages.len(),
        group.members.len()
    );
    if let Some(last) = messages.last() {
        println!(
            "  Last message from {}: {}",
            last.sender_name,
            super::truncate_chars(&last.text, 80).dimmed()
        );
    }
    println!();
    println!("{}", saved.content);
    println!(
        "\n  {} summary #{} at {}",
        "Saved".green(),
        saved.id,
        saved.created_at
    );
}

/// Row counts, one line per table.
pub fn display_stats(stats: &DbStats) {
    println!("  Users:     {}", stats.users);
    println!("  Groups:    {}", stats.groups);
    println!("  Messages:  {}", stats.messages);
    println!("  Files:     {}", stats.files);
    println!("  Summaries: {}", stats.summaries);
}
