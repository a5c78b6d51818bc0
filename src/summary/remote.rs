// Remote language-model summarizer (Anthropic Messages API).
//
// Paid API, so it's opt-in via STUDYHUB_SUMMARIZER=remote. Any failure
// (network, non-2xx status, error body, empty content) is logged and the
// request is answered by the heuristic summarizer instead; callers never
// see an error from this implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::heuristic::HeuristicSummarizer;
use super::rate_limiter::RateLimiter;
use super::traits::Summarizer;
use super::{below_minimum, NOT_ENOUGH_CONTENT};

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 300;

/// Summarizer backed by a hosted model, with a heuristic fallback.
pub struct RemoteModelSummarizer {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    rate_limiter: RateLimiter,
    fallback: HeuristicSummarizer,
}

impl RemoteModelSummarizer {
    pub fn new(api_key: String, model: String, fallback: HeuristicSummarizer) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            // One request per second keeps us well inside the API's limits
            rate_limiter: RateLimiter::new(1.0),
            fallback,
        }
    }

    /// Point the summarizer at a different Messages-compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Call the API once. Errors are returned, not swallowed.
    pub async fn request_summary(&self, text: &str, max_sentences: usize) -> Result<String> {
        self.rate_limiter.acquire().await;

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(text, max_sentences),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .context("Failed to call summarization API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Summarization API returned {}: {}", status, body);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse summarization API response")?;

        summary_from_response(body)
    }
}

#[async_trait]
impl Summarizer for RemoteModelSummarizer {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn summarize(&self, text: &str, max_sentences: usize) -> Result<String> {
        if below_minimum(text) {
            return Ok(NOT_ENOUGH_CONTENT.to_string());
        }

        match self.request_summary(text, max_sentences).await {
            Ok(summary) => {
                debug!(model = %self.model, chars = summary.len(), "Remote summary received");
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "Remote summarizer failed, using heuristic fallback");
                self.fallback.summarize(text, max_sentences).await
            }
        }
    }
}

fn build_prompt(text: &str, max_sentences: usize) -> String {
    format!(
        "Summarize this study group discussion in at most {max_sentences} sentences:\n\n{text}"
    )
}

fn summary_from_response(body: MessagesResponse) -> Result<String> {
    if let Some(error) = body.error {
        anyhow::bail!("Summarization API error: {}", error.message);
    }
    let text = body
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Summarization API returned no text");
    }
    Ok(text.to_string())
}

// --- Messages API request/response types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
