// Current-user handlers.
//
// GET /api/users/me   — the caller's profile, used for role-based UI
// GET /api/protected  — echoes the authenticated identity

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

use crate::web::{api_error, internal_error, AppState, AuthUser};

pub async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> Response {
    match state.db.get_user(auth.id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => api_error(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => internal_error("Failed to load user", e),
    }
}

pub async fn protected(Extension(auth): Extension<AuthUser>) -> Response {
    Json(serde_json::json!({
        "message": "You accessed a protected route",
        "user": { "id": auth.id, "role": auth.role },
    }))
    .into_response()
}
