// System status display — database size, row counts, summarizer settings.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;

/// Display system status to the terminal.
pub async fn show(db: &Arc<dyn Database>, config: &Config) -> Result<()> {
    match &config.database_url {
        Some(url) if url.starts_with("postgres") => println!("Database: PostgreSQL"),
        _ => {
            let file_size = std::fs::metadata(&config.db_path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Database: {} ({})", config.db_path, file_size);
        }
    }

    let stats = db.stats().await?;
    crate::output::terminal::display_stats(&stats);

    println!(
        "Summarizer: {:?} (chat {} sentences, documents {})",
        config.summarizer_backend, config.chat_sentences, config.document_sentences
    );
    println!("Stop words: {}", config.stop_words);

    if Path::new(&config.upload_dir).is_dir() {
        println!("Uploads: {}", config.upload_dir.display());
    } else {
        println!("Uploads: {} (not created yet)", config.upload_dir.display());
    }

    Ok(())
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
