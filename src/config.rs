use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::summary::remote::{RemoteModelSummarizer, DEFAULT_MODEL};
use crate::summary::stop_words::StopWords;
use crate::summary::{
    HeuristicSummarizer, Summarizer, DEFAULT_CHAT_SENTENCES, DEFAULT_DOCUMENT_SENTENCES,
};

/// Which summarization backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum SummarizerBackend {
    /// Frequency-based extractive summarizer (default), offline and deterministic
    Heuristic,
    /// Hosted language model. Requires CLAUDE_API_KEY; falls back to heuristic
    Remote,
}

/// Runtime settings, read from `STUDYHUB_*` environment variables (and a
/// `.env` file when main loads one).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// A `postgres://` URL here switches storage to PostgreSQL
    pub database_url: Option<String>,
    pub summarizer_backend: SummarizerBackend,
    pub claude_api_key: String,
    pub remote_model: String,
    /// `builtin`, `english`, `none`, or a path to a word list
    pub stop_words: String,
    pub chat_sentences: usize,
    pub document_sentences: usize,
    /// Where uploaded files are written and served from
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Secret for HMAC session token signing (STUDYHUB_SESSION_SECRET env var)
    #[cfg(feature = "web")]
    pub session_secret: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "./studyhub.db".to_string(),
            database_url: None,
            summarizer_backend: SummarizerBackend::Heuristic,
            claude_api_key: String::new(),
            remote_model: DEFAULT_MODEL.to_string(),
            stop_words: "builtin".to_string(),
            chat_sentences: DEFAULT_CHAT_SENTENCES,
            document_sentences: DEFAULT_DOCUMENT_SENTENCES,
            upload_dir: PathBuf::from("./uploads"),
            max_upload_bytes: 20 * 1024 * 1024,
            #[cfg(feature = "web")]
            session_secret: String::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables over the defaults.
    ///
    /// Nothing is required up front; commands that need a secret call the
    /// matching `require_*` helper.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let summarizer_backend = match env::var("STUDYHUB_SUMMARIZER").as_deref() {
            Ok("remote") => SummarizerBackend::Remote,
            // "heuristic" or unset both default to the local summarizer
            _ => SummarizerBackend::Heuristic,
        };

        Ok(Self {
            db_path: env::var("STUDYHUB_DB_PATH").unwrap_or(defaults.db_path),
            database_url: env::var("DATABASE_URL").ok(),
            summarizer_backend,
            claude_api_key: env::var("CLAUDE_API_KEY").unwrap_or_default(),
            remote_model: env::var("STUDYHUB_REMOTE_MODEL").unwrap_or(defaults.remote_model),
            stop_words: env::var("STUDYHUB_STOP_WORDS").unwrap_or(defaults.stop_words),
            chat_sentences: parse_var("STUDYHUB_CHAT_SENTENCES", defaults.chat_sentences)?,
            document_sentences: parse_var(
                "STUDYHUB_DOCUMENT_SENTENCES",
                defaults.document_sentences,
            )?,
            upload_dir: env::var("STUDYHUB_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_var("STUDYHUB_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            #[cfg(feature = "web")]
            session_secret: env::var("STUDYHUB_SESSION_SECRET").unwrap_or_default(),
        })
    }

    /// Check that the remote summarizer has an API key.
    pub fn require_remote(&self) -> Result<()> {
        if self.claude_api_key.is_empty() {
            anyhow::bail!(
                "CLAUDE_API_KEY not set but STUDYHUB_SUMMARIZER=remote.\n\
                 Add the key to your .env file, or unset STUDYHUB_SUMMARIZER to use \
                 the built-in heuristic summarizer."
            );
        }
        Ok(())
    }

    /// Check that the web server can sign session tokens.
    #[cfg(feature = "web")]
    pub fn require_web(&self) -> Result<()> {
        if self.session_secret.len() < 32 {
            anyhow::bail!(
                "STUDYHUB_SESSION_SECRET must be set to at least 32 characters.\n\
                 Generate one with: openssl rand -hex 32"
            );
        }
        Ok(())
    }

    /// Resolve the configured stop-word setting.
    pub fn load_stop_words(&self) -> Result<StopWords> {
        StopWords::from_setting(&self.stop_words)
            .with_context(|| format!("Failed to load stop words from '{}'", self.stop_words))
    }

    /// Build the configured summarizer.
    pub fn create_summarizer(&self) -> Result<Arc<dyn Summarizer>> {
        let heuristic = HeuristicSummarizer::new(self.load_stop_words()?);
        match self.summarizer_backend {
            SummarizerBackend::Heuristic => Ok(Arc::new(heuristic)),
            SummarizerBackend::Remote => {
                self.require_remote()?;
                Ok(Arc::new(RemoteModelSummarizer::new(
                    self.claude_api_key.clone(),
                    self.remote_model.clone(),
                    heuristic,
                )))
            }
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got '{raw}'")),
        _ => Ok(default),
    }
}
