// HTTP API tests — the full router driven in-process with tower's oneshot.
//
// Backed by an in-memory SQLite database and the heuristic summarizer, so no
// network or disk database is needed.

#![cfg(all(feature = "web", feature = "sqlite"))]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use studyhub::config::Config;
use studyhub::db::models::UserRole;
use studyhub::db::sqlite::SqliteDatabase;
use studyhub::db::Database;
use studyhub::summary::transcript::NO_MESSAGES;
use studyhub::summary::HeuristicSummarizer;
use studyhub::web::{build_router, AppState};

struct TestApp {
    router: Router,
    db: Arc<dyn Database>,
}

fn test_app() -> TestApp {
    let config = Config {
        session_secret: "test-secret-that-is-at-least-32-characters".to_string(),
        upload_dir: std::env::temp_dir().join(format!("studyhub_web_{}", std::process::id())),
        ..Config::default()
    };
    let db: Arc<dyn Database> = Arc::new(SqliteDatabase::in_memory().unwrap());
    let state = AppState::new(config, db.clone(), Arc::new(HeuristicSummarizer::default()));
    TestApp {
        router: build_router(state),
        db,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// GET a path and return the raw body, for non-JSON responses.
    async fn fetch(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn register(&self, name: &str, email: &str) -> i64 {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "hunter22" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "password": "hunter22" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app();
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn registration_validates_and_rejects_duplicates() {
    let app = test_app();
    app.register("Ada", "ada@example.com").await;

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ada Again", "email": "ADA@example.com", "password": "hunter22" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Short", "email": "short@example.com", "password": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_for_one_email_conflict() {
    let app = test_app();
    for round in 0..5 {
        let email = format!("twin{round}@example.com");
        let body = json!({ "name": "Twin", "email": email, "password": "hunter22" });
        let (first, second) = tokio::join!(
            app.call("POST", "/api/auth/register", None, Some(body.clone())),
            app.call("POST", "/api/auth/register", None, Some(body)),
        );

        let mut statuses = [first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
        let conflict = if first.0 == StatusCode::CONFLICT { first.1 } else { second.1 };
        assert_eq!(conflict["error"], "Email already registered");
    }
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = test_app();
    app.register("Ada", "ada@example.com").await;
    let (status, body) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = test_app();
    let (status, body) = app.call("GET", "/api/groups/my-groups", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");

    let (status, _) = app
        .call("GET", "/api/users/me", Some("not.a.real.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_create_groups() {
    let app = test_app();
    app.register("Grace", "grace@example.com").await;
    let token = app.login("grace@example.com").await;

    let (status, body) = app
        .call(
            "POST",
            "/api/groups/create",
            Some(&token),
            Some(json!({ "name": "Compilers" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Only admins can create groups");
}

#[tokio::test]
async fn group_chat_summary_flow() {
    let app = test_app();
    let ada_id = app.register("Ada", "ada@example.com").await;
    let grace_id = app.register("Grace", "grace@example.com").await;
    app.register("Linus", "linus@example.com").await;
    assert!(app
        .db
        .set_user_role("ada@example.com", UserRole::Admin)
        .await
        .unwrap());

    let ada = app.login("ada@example.com").await;
    let grace = app.login("grace@example.com").await;
    let linus = app.login("linus@example.com").await;

    // Create
    let (status, group) = app
        .call(
            "POST",
            "/api/groups/create",
            Some(&ada),
            Some(json!({ "name": "Algorithms", "description": "CS 201" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{group}");
    let group_id = group["id"].as_i64().unwrap();
    assert_eq!(group["members"], json!([ada_id]));

    // Join
    let join = format!("/api/groups/join/{group_id}");
    let (status, body) = app.call("POST", &join, Some(&grace), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["group"]["members"], json!([ada_id, grace_id]));
    let (status, body) = app.call("POST", &join, Some(&grace), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already a member");
    let (status, _) = app
        .call("POST", "/api/groups/join/9999", Some(&grace), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No messages yet
    let summary_uri = format!("/api/summary/{group_id}");
    let (status, body) = app.call("GET", &summary_uri, Some(&grace), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], NO_MESSAGES);

    // Chat
    let lines = [
        (&ada, "Tomorrow we should review heaps and priority queues before the quiz."),
        (&grace, "Heaps keep the smallest element at the root after every insertion."),
        (&ada, "Priority queues built on heaps give logarithmic insertion and removal."),
    ];
    for (token, text) in lines {
        let (status, body) = app
            .call(
                "POST",
                "/api/messages/send",
                Some(token),
                Some(json!({ "group_id": group_id, "text": text })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let messages_uri = format!("/api/messages/{group_id}");
    let (status, body) = app.call("GET", &messages_uri, Some(&grace), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[1]["sender_name"], "Grace");

    // Outsiders
    let (status, body) = app.call("GET", &messages_uri, Some(&linus), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Not a group member");
    let (status, _) = app
        .call(
            "POST",
            "/api/messages/send",
            Some(&linus),
            Some(json!({ "group_id": group_id, "text": "let me in" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call("GET", "/api/summary/9999", Some(&linus), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Summarize and check history
    let (status, body) = app.call("GET", &summary_uri, Some(&grace), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let summary = body["summary"].as_str().unwrap().to_string();
    assert!(summary.contains("heaps"));
    assert_eq!(body["saved"]["source"], "chat");
    assert_eq!(body["saved"]["generated_by"], grace_id);

    let history_uri = format!("/api/summary/{group_id}/history?limit=5");
    let (status, body) = app.call("GET", &history_uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["content"], summary);

    // Listings
    let (_, mine) = app
        .call("GET", "/api/groups/my-groups", Some(&grace), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, mine) = app
        .call("GET", "/api/groups/my-groups", Some(&linus), None)
        .await;
    assert!(mine.as_array().unwrap().is_empty());
    let (_, all) = app.call("GET", "/api/groups/all", Some(&linus), None).await;
    assert_eq!(all[0]["members"].as_array().unwrap().len(), 2);
    assert_eq!(all[0]["members"][0]["email"], "ada@example.com");
}

const BOUNDARY: &str = "studyhub-test-boundary";

fn multipart_body(group_id: i64, file_name: &str, mime: &str, contents: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"group_id\"\r\n\r\n\
         {group_id}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: {mime}\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    )
}

fn upload_request(token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn uploaded_notes_are_listed_announced_and_summarized() {
    let app = test_app();
    app.register("Ada", "ada@example.com").await;
    app.register("Linus", "linus@example.com").await;
    app.db
        .set_user_role("ada@example.com", UserRole::Admin)
        .await
        .unwrap();
    let ada = app.login("ada@example.com").await;
    let linus = app.login("linus@example.com").await;

    let (_, group) = app
        .call(
            "POST",
            "/api/groups/create",
            Some(&ada),
            Some(json!({ "name": "Networks" })),
        )
        .await;
    let group_id = group["id"].as_i64().unwrap();

    let notes = "TCP retransmits segments that are not acknowledged in time. \
                 Congestion control shrinks the window whenever packets are lost. \
                 UDP skips both mechanisms and leaves reliability to the application.";

    // Outsiders can't upload
    let (status, _) = app
        .send(upload_request(
            &linus,
            multipart_body(group_id, "tcp.txt", "text/plain", notes),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, file) = app
        .send(upload_request(
            &ada,
            multipart_body(group_id, "tcp.txt", "text/plain", notes),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{file}");
    assert_eq!(file["original_name"], "tcp.txt");
    assert!(file["file_name"].as_str().unwrap().ends_with(".txt"));
    let file_id = file["id"].as_i64().unwrap();

    let (status, files) = app
        .call("GET", &format!("/api/files/{group_id}"), Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(files.as_array().unwrap().len(), 1);

    // The upload shows up in chat as a file message
    let (_, messages) = app
        .call("GET", &format!("/api/messages/{group_id}"), Some(&ada), None)
        .await;
    assert_eq!(messages[0]["kind"], "file");
    let announcement = messages[0]["text"].as_str().unwrap();
    let (name, link) = announcement.split_once('\n').unwrap();
    assert_eq!(name, "tcp.txt");
    assert_eq!(link, format!("/uploads/{}", file["file_name"].as_str().unwrap()));

    // The link serves the stored copy
    let (status, served) = app.fetch(link).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, notes.as_bytes());

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/files/summary/{file_id}"),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["summary"].as_str().unwrap().contains("TCP"));

    let (_, history) = app
        .call(
            "GET",
            &format!("/api/summary/{group_id}/history"),
            Some(&ada),
            None,
        )
        .await;
    assert_eq!(history[0]["source"], "document");

    // A file-only chat has nothing to summarize
    let (_, body) = app
        .call("GET", &format!("/api/summary/{group_id}"), Some(&ada), None)
        .await;
    assert_eq!(body["summary"], NO_MESSAGES);

    let (status, body) = app
        .call("GET", "/api/files/summary/9999", Some(&ada), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "File not found");
}
