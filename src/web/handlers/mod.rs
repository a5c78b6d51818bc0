// HTTP handlers, one module per resource.
//
// Group-scoped routes share the same access rule: the group must exist
// (404 "Group not found") and the caller must belong to it
// (403 "Not a group member").

pub mod auth;
pub mod files;
pub mod groups;
pub mod messages;
pub mod summary;
pub mod users;

use axum::http::StatusCode;
use axum::response::Response;

use crate::db::models::StudyGroup;
use crate::web::{api_error, internal_error, AppState};

#[derive(Debug, thiserror::Error)]
pub enum GroupAccessError {
    #[error("Group not found")]
    NotFound,

    #[error("Not a group member")]
    NotMember,

    #[error("Failed to load group")]
    Database(#[source] anyhow::Error),
}

impl GroupAccessError {
    pub fn into_response(self) -> Response {
        match self {
            GroupAccessError::NotFound => api_error(StatusCode::NOT_FOUND, "Group not found"),
            GroupAccessError::NotMember => api_error(StatusCode::FORBIDDEN, "Not a group member"),
            GroupAccessError::Database(e) => internal_error("Failed to load group", e),
        }
    }
}

/// Load a group the caller belongs to.
pub async fn member_group(
    state: &AppState,
    group_id: i64,
    user_id: i64,
) -> Result<StudyGroup, GroupAccessError> {
    let group = state
        .db
        .get_group(group_id)
        .await
        .map_err(GroupAccessError::Database)?
        .ok_or(GroupAccessError::NotFound)?;

    if !group.has_member(user_id) {
        return Err(GroupAccessError::NotMember);
    }
    Ok(group)
}
