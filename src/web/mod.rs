// Web server — Axum JSON API, uploaded-file serving and realtime chat.
//
// All /api/* routes serve JSON. Errors are `{ "error": message }` with a
// matching status code. Uploaded files are served as-is under /uploads.
//
// Auth: stateless HMAC-SHA256 session tokens carrying the user id and role,
// sent as a cookie or a Bearer header. No session table in the DB.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::db::models::UserRole;
use crate::db::Database;
use crate::summary::Summarizer;

pub mod auth;
pub mod chat;
pub mod handlers;
pub mod password;
pub mod uploads;

use chat::ChatHub;

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Arc<Config>,
    pub summarizer: Arc<dyn Summarizer>,
    pub chat: Arc<ChatHub>,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn Database>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            summarizer,
            chat: Arc::new(ChatHub::new()),
        }
    }
}

/// Serve the API on `bind:port` until Ctrl-C.
///
/// Ctrl-C closes every chat room first so open WebSockets end cleanly,
/// then lets in-flight requests finish.
pub async fn run_server(
    config: Config,
    db: Arc<dyn Database>,
    summarizer: Arc<dyn Summarizer>,
    port: u16,
    bind: &str,
) -> Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = AppState::new(config, db, summarizer);
    let chat = state.chat.clone();
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("StudyHub listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
            chat.shutdown();
        })
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    // Authenticated API routes (require a valid session token)
    let protected_api = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/users/me", get(handlers::users::me))
        .route("/api/protected", get(handlers::users::protected))
        .route("/api/groups/create", post(handlers::groups::create_group))
        .route(
            "/api/groups/join/{group_id}",
            post(handlers::groups::join_group),
        )
        .route("/api/groups/my-groups", get(handlers::groups::my_groups))
        .route("/api/groups/all", get(handlers::groups::all_groups))
        .route("/api/messages/send", post(handlers::messages::send_message))
        .route(
            "/api/messages/{group_id}",
            get(handlers::messages::list_messages),
        )
        .route("/api/files/upload", post(handlers::files::upload_file))
        .route(
            "/api/files/summary/{file_id}",
            get(handlers::files::summarize_file),
        )
        .route("/api/files/{group_id}", get(handlers::files::list_files))
        .route(
            "/api/summary/{group_id}",
            get(handlers::summary::summarize_group),
        )
        .route(
            "/api/summary/{group_id}/history",
            get(handlers::summary::summary_history),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Public routes (no auth). The WebSocket checks its token itself because
    // browsers can't set headers on the upgrade request.
    let public_api = Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/ws", get(chat::ws_handler));

    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .merge(protected_api)
        .merge(public_api)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// `{ "error": message }` with the given status.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

/// Log an unexpected failure and answer with a generic 500.
pub fn internal_error(context: &str, err: anyhow::Error) -> Response {
    error!(error = %err, "{context}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, context)
}

/// The authenticated caller, inserted into request extensions by
/// `require_auth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
