// Shared file handlers.
//
// POST /api/files/upload           — multipart: group_id + file
// GET  /api/files/summary/{file_id} — extract the document and summarize it
// GET  /api/files/{group_id}        — uploads for a group, newest first
//
// Each upload also posts a "file" message to the group chat so members see
// it arrive in real time. Its text is the original name, a newline, then the
// /uploads link to the stored copy.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::{info, warn};

use super::member_group;
use crate::db::models::{MessageKind, NewFile, SummarySource};
use crate::documents::{self, DocumentFormat, ExtractError, DOCUMENT_NOTICES};
use crate::summary::NOT_ENOUGH_CONTENT;
use crate::web::uploads::{clean_original_name, file_announcement, save_upload};
use crate::web::{api_error, internal_error, AppState, AuthUser};

struct UploadForm {
    group_id: Option<i64>,
    file: Option<(String, Option<String>, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, Response> {
    let mut form = UploadForm {
        group_id: None,
        file: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(api_error(StatusCode::BAD_REQUEST, &e.body_text())),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("group_id") | Some("groupId") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, &e.body_text()))?;
                form.group_id = raw.trim().parse().ok();
            }
            Some("file") => {
                let name = clean_original_name(field.file_name().unwrap_or("upload"));
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(e.status(), &e.body_text()))?;
                form.file = Some((name, mime, bytes.to_vec()));
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn upload_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let Some(group_id) = form.group_id else {
        return api_error(StatusCode::BAD_REQUEST, "group_id is required");
    };
    let Some((original_name, file_type, bytes)) = form.file else {
        return api_error(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    if let Err(e) = member_group(&state, group_id, auth.id).await {
        return e.into_response();
    }

    let (file_name, path) =
        match save_upload(&state.config.upload_dir, &original_name, &bytes).await {
            Ok(saved) => saved,
            Err(e) => return internal_error("Failed to store upload", e),
        };

    let new_file = NewFile {
        group_id,
        uploaded_by: auth.id,
        original_name,
        file_name,
        file_type,
        file_path: path.display().to_string(),
        size: bytes.len() as i64,
    };
    let stored = match state.db.insert_file(&new_file).await {
        Ok(stored) => stored,
        Err(e) => return internal_error("Failed to record upload", e),
    };
    info!(file_id = stored.id, group_id, size = stored.size, "File uploaded");

    let announcement = file_announcement(&stored.original_name, &stored.file_name);
    match state
        .db
        .insert_message(group_id, auth.id, &announcement, MessageKind::File)
        .await
    {
        Ok(message) => {
            state.chat.publish(message);
        }
        Err(e) => warn!(error = %e, file_id = stored.id, "Failed to announce upload in chat"),
    }

    (StatusCode::CREATED, Json(stored)).into_response()
}

/// Map an extraction failure to a status code and the message users see.
pub fn extract_error_response(err: &ExtractError) -> Response {
    let status = match err {
        ExtractError::NotFound(_) => StatusCode::NOT_FOUND,
        ExtractError::UnsupportedFormat(_) | ExtractError::Parse(_) => StatusCode::BAD_REQUEST,
        ExtractError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.user_message())
}

pub async fn summarize_file(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(file_id): Path<i64>,
) -> Response {
    let file = match state.db.get_file(file_id).await {
        Ok(Some(file)) => file,
        Ok(None) => return api_error(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => return internal_error("Failed to summarize document", e),
    };
    if let Err(e) = member_group(&state, file.group_id, auth.id).await {
        return e.into_response();
    }

    let path = PathBuf::from(&file.file_path);
    let format =
        DocumentFormat::detect(&path, file.file_type.as_deref()).unwrap_or(DocumentFormat::Pdf);
    let text = match documents::extract_text_blocking(path, file.file_type.clone()).await {
        Ok(text) => text,
        Err(e) => {
            warn!(file_id, error = %e, "Document extraction failed");
            return extract_error_response(&e);
        }
    };

    let summary = match documents::summarize_document(
        state.summarizer.as_ref(),
        &text,
        format,
        state.config.document_sentences,
    )
    .await
    {
        Ok(summary) => summary,
        Err(e) => return internal_error("Failed to summarize document", e),
    };

    let notice = DOCUMENT_NOTICES.contains(&summary.as_str()) || summary == NOT_ENOUGH_CONTENT;
    if !notice {
        if let Err(e) = state
            .db
            .save_summary(file.group_id, auth.id, SummarySource::Document, &summary)
            .await
        {
            warn!(file_id, error = %e, "Failed to save document summary");
        }
    }

    Json(serde_json::json!({
        "file_id": file.id,
        "original_name": file.original_name,
        "summary": summary,
    }))
    .into_response()
}

pub async fn list_files(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(group_id): Path<i64>,
) -> Response {
    if let Err(e) = member_group(&state, group_id, auth.id).await {
        return e.into_response();
    }
    match state.db.list_group_files(group_id).await {
        Ok(files) => Json(files).into_response(),
        Err(e) => internal_error("Failed to load files", e),
    }
}
