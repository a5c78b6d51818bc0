// Batch document summarization — the `studyhub summarize FILE...` path.
//
// Extraction runs on the blocking pool and summaries are requested
// concurrently (bounded by `concurrency`). Results come back in the order
// the files were given, whatever order they finish in.

use std::path::PathBuf;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::warn;

use crate::documents::{extract_text_blocking, summarize_document, DocumentFormat};
use crate::summary::Summarizer;

/// Outcome for one input file.
#[derive(Debug)]
pub struct FileSummary {
    pub path: PathBuf,
    /// The summary, or a message explaining why there isn't one.
    pub result: Result<String, String>,
}

impl FileSummary {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Summarize each file with at most `max_sentences` sentences.
pub async fn summarize_files(
    summarizer: &dyn Summarizer,
    paths: Vec<PathBuf>,
    max_sentences: usize,
    concurrency: usize,
    show_progress: bool,
) -> Vec<FileSummary> {
    let pb = ProgressBar::new(paths.len() as u64);
    if !show_progress {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Summarizing [{bar:30}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let pb_ref = &pb;
    let mut results: Vec<(usize, FileSummary)> = stream::iter(paths.into_iter().enumerate().map(
        |(index, path)| async move {
            let result = summarize_one(summarizer, &path, max_sentences).await;
            pb_ref.inc(1);
            (index, FileSummary { path, result })
        },
    ))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;
    pb.finish_and_clear();

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, summary)| summary).collect()
}

async fn summarize_one(
    summarizer: &dyn Summarizer,
    path: &std::path::Path,
    max_sentences: usize,
) -> Result<String, String> {
    let text = match extract_text_blocking(path.to_path_buf(), None).await {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping file");
            return Err(e.user_message().to_string());
        }
    };

    let format = DocumentFormat::detect(path, None).unwrap_or(DocumentFormat::Pdf);
    summarize_document(summarizer, &text, format, max_sentences)
        .await
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::HeuristicSummarizer;

    #[tokio::test]
    async fn test_results_keep_input_order_and_report_failures() {
        let dir = std::env::temp_dir().join(format!("studyhub_batch_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let notes = dir.join("notes.txt");
        std::fs::write(
            &notes,
            "Binary search halves the interval on every comparison step. \
             It only works when the input array is already sorted.",
        )
        .unwrap();
        let blank = dir.join("blank.md");
        std::fs::write(&blank, "   \n").unwrap();
        let missing = dir.join("missing.txt");
        let slides = dir.join("slides.pptx");

        let summarizer = HeuristicSummarizer::default();
        let results = summarize_files(
            &summarizer,
            vec![notes.clone(), missing.clone(), slides.clone(), blank.clone()],
            7,
            3,
            false,
        )
        .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].path, notes);
        assert!(results[0].is_ok());
        assert!(results[1].result.as_ref().unwrap_err().contains("re-upload"));
        assert!(results[2].result.as_ref().unwrap_err().contains("Only PDF"));
        assert_eq!(
            results[3].result.as_deref(),
            Ok(crate::documents::NO_READABLE_FILE_TEXT)
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}
