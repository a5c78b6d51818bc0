// Chat message handlers.
//
// POST /api/messages/send       — store a message and push it to the room
// GET  /api/messages/{group_id} — full history, oldest first

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use super::member_group;
use crate::db::models::MessageKind;
use crate::web::{api_error, internal_error, AppState, AuthUser};

#[derive(Deserialize)]
pub struct SendMessageRequest {
    group_id: i64,
    text: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendMessageRequest>,
) -> Response {
    let text = body.text.trim();
    if text.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Message text is required");
    }
    if let Err(e) = member_group(&state, body.group_id, auth.id).await {
        return e.into_response();
    }

    match state
        .db
        .insert_message(body.group_id, auth.id, text, MessageKind::Text)
        .await
    {
        Ok(message) => {
            state.chat.publish(message.clone());
            (StatusCode::CREATED, Json(message)).into_response()
        }
        Err(e) => internal_error("Failed to send message", e),
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<i64>,
) -> Response {
    if let Err(e) = member_group(&state, group_id, auth.id).await {
        return e.into_response();
    }
    match state.db.get_group_messages(group_id).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => internal_error("Failed to load messages", e),
    }
}
