// Auth handlers — register, login, logout.
//
// Login checks the PBKDF2 hash and returns a signed session token, both in
// the JSON body (for Bearer use and the WebSocket) and as an HttpOnly cookie.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::db::models::UserRole;
use crate::db::DbError;
use crate::web::auth::{clear_cookie_header, create_token, set_cookie_header};
use crate::web::password::{hash_password, verify_password};
use crate::web::{api_error, internal_error, AppState};

/// Passwords shorter than this are rejected at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// POST /api/auth/register — create a member account.
pub async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> Response {
    let name = body.name.trim();
    let email = body.email.trim();
    if name.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "Name is required");
    }
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return api_error(StatusCode::BAD_REQUEST, "A valid email is required");
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        );
    }

    match state.db.get_credentials_by_email(email).await {
        Ok(Some(_)) => return api_error(StatusCode::CONFLICT, "Email already registered"),
        Ok(None) => {}
        Err(e) => return internal_error("Failed to register user", e),
    }

    // PBKDF2 is deliberately slow; keep it off the async workers
    let password = body.password;
    let hash = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(hash) => hash,
        Err(e) => return internal_error("Failed to register user", e.into()),
    };

    match state
        .db
        .create_user(name, email, &hash, UserRole::Member)
        .await
    {
        Ok(user) => {
            info!(user_id = user.id, "User registered");
            (StatusCode::CREATED, Json(user)).into_response()
        }
        // Lost a race with a concurrent registration for the same email
        Err(e) if DbError::is_duplicate_email(&e) => {
            api_error(StatusCode::CONFLICT, "Email already registered")
        }
        Err(e) => internal_error("Failed to register user", e),
    }
}

/// POST /api/auth/login — exchange email and password for a session token.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    let credentials = match state.db.get_credentials_by_email(&body.email).await {
        Ok(c) => c,
        Err(e) => return internal_error("Failed to log in", e),
    };

    let Some(credentials) = credentials else {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };

    let stored = credentials.password_hash.clone();
    let password = body.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false);
    if !valid {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid email or password");
    }

    let user = credentials.user;
    let token = create_token(&state.config.session_secret, user.id, user.role);
    // Deployments terminate TLS at a proxy, so the server can't tell
    let cookie = set_cookie_header(&token, false);

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "token": token, "user": user })),
    )
        .into_response()
}

/// POST /api/auth/logout — clear the session cookie.
pub async fn logout() -> Response {
    let cookie = clear_cookie_header();
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response()
}
