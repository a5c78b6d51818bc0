// Auth middleware — stateless HMAC-SHA256 session tokens.
//
// Token format: {subject_b64}.{timestamp_secs}.{nonce_hex}.{hmac_hex}
//
// The subject is "{user_id}:{role}", base64url-encoded. The HMAC covers
// "{subject_b64}.{timestamp_secs}.{nonce_hex}" signed with
// STUDYHUB_SESSION_SECRET. Tokens are valid for SESSION_TTL_SECS (24 hours).
//
// Login flow:
//   POST /api/auth/login { email, password } → verify password hash
//     success: token in the body and in the studyhub_session cookie
//     failure: 401
//
// Auth check (this middleware):
//   cookie or `Authorization: Bearer` → parse → verify HMAC → verify age →
//   insert AuthUser

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use super::{AppState, AuthUser};
use crate::db::models::UserRole;

type HmacSha256 = Hmac<Sha256>;

/// Session cookie name.
pub const COOKIE_NAME: &str = "studyhub_session";

/// Session lifetime: 24 hours.
pub const SESSION_TTL_SECS: u64 = 86_400;

/// Build a new session token for `user_id` signed with `secret`.
pub fn create_token(secret: &str, user_id: i64, role: UserRole) -> String {
    create_token_at(secret, user_id, role, now_secs())
}

fn create_token_at(secret: &str, user_id: i64, role: UserRole, timestamp: u64) -> String {
    let subject = URL_SAFE_NO_PAD.encode(format!("{user_id}:{}", role.as_str()));

    let mut nonce_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = hex::encode(nonce_bytes);

    let payload = format!("{subject}.{timestamp}.{nonce}");
    let sig = hmac_sign(secret, &payload);

    format!("{payload}.{sig}")
}

/// Verify a session token and recover who it belongs to.
///
/// Returns `None` if the HMAC doesn't match, the token is older than
/// `SESSION_TTL_SECS`, or any part is malformed.
pub fn verify_token(secret: &str, token: &str) -> Option<AuthUser> {
    let parts: Vec<&str> = token.split('.').collect();
    let [subject, timestamp_str, nonce, provided_sig] = parts.as_slice() else {
        return None;
    };

    let payload = format!("{subject}.{timestamp_str}.{nonce}");
    let expected_sig = hmac_sign(secret, &payload);
    if !constant_time_eq(provided_sig, &expected_sig) {
        return None;
    }

    let timestamp = timestamp_str.parse::<u64>().ok()?;
    if now_secs().saturating_sub(timestamp) >= SESSION_TTL_SECS {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD.decode(subject).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, role) = decoded.split_once(':')?;
    Some(AuthUser {
        id: id.parse().ok()?,
        role: UserRole::parse(role),
    })
}

/// Axum middleware: reject requests without a valid session with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = token_from_headers(request.headers())
        .and_then(|token| verify_token(&state.config.session_secret, &token));

    let Some(user) = user else {
        return super::api_error(
            axum::http::StatusCode::UNAUTHORIZED,
            "Authentication required",
        );
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Build the `Set-Cookie` header value for a new session.
pub fn set_cookie_header(token: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{COOKIE_NAME}={token}; HttpOnly{secure_flag}; SameSite=Strict; Path=/; Max-Age={SESSION_TTL_SECS}"
    )
}

/// Build the `Set-Cookie` header value that clears the session cookie.
pub fn clear_cookie_header() -> String {
    format!("{COOKIE_NAME}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// Pull the session token from `Authorization: Bearer` or the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }

    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == COOKIE_NAME).then(|| value.trim().to_string())
    })
}

// --- Private helpers ---

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn hmac_sign(secret: &str, payload: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compare without short-circuiting on the first differing byte.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
