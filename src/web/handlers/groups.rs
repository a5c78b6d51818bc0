// Study group handlers.
//
// POST /api/groups/create          — admins only
// POST /api/groups/join/{group_id} — join an existing group
// GET  /api/groups/my-groups       — groups the caller belongs to
// GET  /api/groups/all             — every group, members populated

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::info;

use crate::web::{api_error, internal_error, AppState, AuthUser};

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateGroupRequest>,
) -> Response {
    if !auth.is_admin() {
        return api_error(StatusCode::FORBIDDEN, "Only admins can create groups");
    }
    let name = body.name.trim();
    if name.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Group name is required");
    }
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    match state.db.create_group(name, description, auth.id).await {
        Ok(group) => {
            info!(group_id = group.id, created_by = auth.id, "Group created");
            (StatusCode::CREATED, Json(group)).into_response()
        }
        Err(e) => internal_error("Failed to create group", e),
    }
}

pub async fn join_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<i64>,
) -> Response {
    match state.db.get_group(group_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "Group not found"),
        Err(e) => return internal_error("Failed to join group", e),
    }

    match state.db.add_group_member(group_id, auth.id).await {
        Ok(false) => api_error(StatusCode::BAD_REQUEST, "Already a member"),
        Ok(true) => match state.db.get_group(group_id).await {
            Ok(Some(group)) => {
                info!(group_id, user_id = auth.id, "Joined group");
                Json(serde_json::json!({ "message": "Joined group", "group": group }))
                    .into_response()
            }
            Ok(None) => api_error(StatusCode::NOT_FOUND, "Group not found"),
            Err(e) => internal_error("Failed to join group", e),
        },
        Err(e) => internal_error("Failed to join group", e),
    }
}

pub async fn my_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Response {
    match state.db.list_groups_for_user(auth.id).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => internal_error("Failed to load groups", e),
    }
}

pub async fn all_groups(State(state): State<AppState>) -> Response {
    match state.db.list_all_groups().await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => internal_error("Failed to load groups", e),
    }
}
