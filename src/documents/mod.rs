// Document text extraction for uploaded files.
//
// PDFs are parsed with `pdf-extract`; plain-text uploads are read as-is.
// Failures are typed so the web layer can map each one to a status code and
// a message the user can act on (re-upload, convert to PDF, retry).

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::summary::{below_minimum, Summarizer};

/// Shown when a PDF contains no extractable text (scanned images, empty pages).
pub const NO_READABLE_TEXT: &str = "No readable text found in this PDF.";

/// Shown when a PDF has some text, but not enough to summarize.
pub const NOT_ENOUGH_DOCUMENT_TEXT: &str = "Not enough text found in this PDF to summarize.";

/// Plain-text counterpart of [`NO_READABLE_TEXT`].
pub const NO_READABLE_FILE_TEXT: &str = "No readable text found in this file.";

/// Plain-text counterpart of [`NOT_ENOUGH_DOCUMENT_TEXT`].
pub const NOT_ENOUGH_FILE_TEXT: &str = "Not enough text found in this file to summarize.";

/// Every message [`summarize_document`] returns in place of a summary.
pub const DOCUMENT_NOTICES: [&str; 4] = [
    NO_READABLE_TEXT,
    NOT_ENOUGH_DOCUMENT_TEXT,
    NO_READABLE_FILE_TEXT,
    NOT_ENOUGH_FILE_TEXT,
];

/// Why text couldn't be pulled out of an uploaded file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error reading upload: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse document: {0}")]
    Parse(String),
}

impl ExtractError {
    /// Message suitable for showing to the person who requested the summary.
    pub fn user_message(&self) -> &'static str {
        match self {
            ExtractError::NotFound(_) => {
                "This file was deleted from uploads folder. Please re-upload it."
            }
            ExtractError::UnsupportedFormat(_) => "Only PDF summarization supported right now.",
            ExtractError::Io(_) => "Could not read the uploaded file. Please try again.",
            ExtractError::Parse(_) => "This PDF could not be read. Please re-upload a valid PDF.",
        }
    }
}

/// The kinds of uploads we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Decide the format from the stored MIME type, falling back to the file
    /// extension when the MIME type is missing or generic.
    pub fn detect(path: &Path, mime: Option<&str>) -> Option<Self> {
        if let Some(mime) = mime.map(str::to_ascii_lowercase) {
            if mime.contains("pdf") {
                return Some(DocumentFormat::Pdf);
            }
            if mime.starts_with("text/") {
                return Some(DocumentFormat::PlainText);
            }
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "txt" | "md" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    pub fn no_readable_text(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => NO_READABLE_TEXT,
            DocumentFormat::PlainText => NO_READABLE_FILE_TEXT,
        }
    }

    pub fn not_enough_text(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => NOT_ENOUGH_DOCUMENT_TEXT,
            DocumentFormat::PlainText => NOT_ENOUGH_FILE_TEXT,
        }
    }
}

/// Extract the text of an uploaded file, trimmed.
///
/// Blocking: PDF parsing is CPU-bound. Async callers should go through
/// [`extract_text_blocking`].
pub fn extract_text(path: &Path, mime: Option<&str>) -> Result<String, ExtractError> {
    let format = DocumentFormat::detect(path, mime).ok_or_else(|| {
        ExtractError::UnsupportedFormat(
            mime.map(str::to_string)
                .unwrap_or_else(|| path.display().to_string()),
        )
    })?;

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ExtractError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(ExtractError::Io(e)),
    };

    let text = match format {
        // pdf-extract panics on some malformed inputs instead of erroring
        DocumentFormat::Pdf => {
            std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
                .map_err(|_| ExtractError::Parse("PDF parser aborted".to_string()))?
                .map_err(|e| ExtractError::Parse(e.to_string()))?
        }
        DocumentFormat::PlainText => String::from_utf8_lossy(&bytes).into_owned(),
    };

    debug!(path = %path.display(), ?format, chars = text.len(), "Extracted document text");
    Ok(text.trim().to_string())
}

/// Run [`extract_text`] on the blocking thread pool.
pub async fn extract_text_blocking(
    path: PathBuf,
    mime: Option<String>,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_text(&path, mime.as_deref()))
        .await
        .map_err(|e| ExtractError::Io(io::Error::other(e)))?
}

/// Summarize extracted document text.
///
/// Empty and very short documents get their own messages so users can tell
/// "this PDF is a scan" apart from "this PDF is just short". The wording
/// names PDFs only when the upload is one.
pub async fn summarize_document(
    summarizer: &dyn Summarizer,
    text: &str,
    format: DocumentFormat,
    max_sentences: usize,
) -> anyhow::Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(format.no_readable_text().to_string());
    }
    if below_minimum(text) {
        return Ok(format.not_enough_text().to_string());
    }

    info!(
        summarizer = summarizer.name(),
        chars = text.len(),
        max_sentences,
        "Summarizing document"
    );
    summarizer.summarize(text, max_sentences).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::HeuristicSummarizer;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("studyhub_documents_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_detect_prefers_mime_then_extension() {
        let pdf = Path::new("notes.bin");
        assert_eq!(
            DocumentFormat::detect(pdf, Some("application/pdf")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::detect(Path::new("notes.PDF"), Some("application/octet-stream")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::detect(Path::new("notes.txt"), None),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(DocumentFormat::detect(Path::new("slides.pptx"), None), None);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = extract_text(Path::new("/nonexistent/lecture.pdf"), Some("application/pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
        assert!(err.user_message().contains("re-upload"));
    }

    #[test]
    fn test_unsupported_type_is_rejected_before_reading() {
        let err = extract_text(Path::new("/nonexistent/slides.pptx"), Some("application/vnd.ms-powerpoint"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_plain_text_is_read_and_trimmed() {
        let path = temp_path("plain.txt");
        std::fs::write(&path, "\n  Chapter one covers sorting.  \n").unwrap();
        let text = extract_text(&path, Some("text/plain")).unwrap();
        assert_eq!(text, "Chapter one covers sorting.");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_garbage_pdf_is_a_parse_error() {
        let path = temp_path("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();
        let err = extract_text(&path, Some("application/pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_summarize_document_messages() {
        let summarizer = HeuristicSummarizer::default();
        assert_eq!(
            summarize_document(&summarizer, "   ", DocumentFormat::Pdf, 7).await.unwrap(),
            NO_READABLE_TEXT
        );
        assert_eq!(
            summarize_document(&summarizer, "Only a line.", DocumentFormat::Pdf, 7)
                .await
                .unwrap(),
            NOT_ENOUGH_DOCUMENT_TEXT
        );
    }

    #[tokio::test]
    async fn test_plain_text_messages_do_not_mention_pdf() {
        let summarizer = HeuristicSummarizer::default();
        let empty = summarize_document(&summarizer, "\n\n", DocumentFormat::PlainText, 7)
            .await
            .unwrap();
        assert_eq!(empty, NO_READABLE_FILE_TEXT);
        let short = summarize_document(&summarizer, "Only a line.", DocumentFormat::PlainText, 7)
            .await
            .unwrap();
        assert_eq!(short, NOT_ENOUGH_FILE_TEXT);
        assert!(!empty.contains("PDF") && !short.contains("PDF"));
        assert!(DOCUMENT_NOTICES.contains(&empty.as_str()));
    }
}
