// Chat summary handlers.
//
// GET /api/summary/{group_id}         — summarize the group chat and save it
// GET /api/summary/{group_id}/history — saved summaries, newest first

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::info;

use super::member_group;
use crate::db::models::SummarySource;
use crate::summary::transcript::{transcript, NO_MESSAGES};
use crate::web::{internal_error, AppState, AuthUser};

const DEFAULT_HISTORY_LIMIT: u32 = 20;
const MAX_HISTORY_LIMIT: u32 = 100;

pub async fn summarize_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<i64>,
) -> Response {
    if let Err(e) = member_group(&state, group_id, auth.id).await {
        return e.into_response();
    }

    let messages = match state.db.get_group_messages(group_id).await {
        Ok(messages) => messages,
        Err(e) => return internal_error("Failed to summarize chat", e),
    };
    let Some(text) = transcript(&messages) else {
        return Json(serde_json::json!({ "summary": NO_MESSAGES })).into_response();
    };

    let content = match state
        .summarizer
        .summarize(&text, state.config.chat_sentences)
        .await
    {
        Ok(content) => content,
        Err(e) => return internal_error("Failed to summarize chat", e),
    };

    match state
        .db
        .save_summary(group_id, auth.id, SummarySource::Chat, &content)
        .await
    {
        Ok(saved) => {
            info!(
                group_id,
                summary_id = saved.id,
                messages = messages.len(),
                summarizer = state.summarizer.name(),
                "Chat summary saved"
            );
            Json(serde_json::json!({
                "message": "Summary generated and saved",
                "summary": saved.content,
                "saved": saved,
            }))
            .into_response()
        }
        Err(e) => internal_error("Failed to save summary", e),
    }
}

#[derive(Deserialize, Default)]
pub struct HistoryQuery {
    /// Number of summaries to return (default 20, max 100)
    pub limit: Option<u32>,
}

pub async fn summary_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<i64>,
    Query(params): Query<HistoryQuery>,
) -> Response {
    if let Err(e) = member_group(&state, group_id, auth.id).await {
        return e.into_response();
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    match state.db.get_group_summaries(group_id, limit).await {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => internal_error("Failed to load summaries", e),
    }
}
