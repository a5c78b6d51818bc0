// Realtime group chat over WebSockets.
//
// ChatHub owns one tokio broadcast channel per study group ("room"). It is
// created once at server start, lives in AppState, and is shut down when the
// server stops. Each socket runs a reader loop plus a writer task; joining a
// room spawns a small task that forwards the room's broadcasts into the
// socket's outbound queue.
//
// Wire protocol (JSON, tagged by "type"):
//   client → server: join_group { group_id }, send_message { group_id, text },
//                    leave_group { group_id }
//   server → client: joined_group { group_id }, left_group { group_id },
//                    new_message { message }, error { message }

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handlers::member_group;
use super::{api_error, auth, AppState, AuthUser};
use crate::db::models::{ChatMessage, MessageKind};

/// Messages buffered per room before slow sockets start missing some.
const ROOM_CAPACITY: usize = 256;

/// Outbound events buffered per socket.
const OUTBOUND_BUFFER: usize = 64;

/// Registry of live chat rooms, keyed by group id.
pub struct ChatHub {
    rooms: Mutex<HashMap<i64, broadcast::Sender<ChatMessage>>>,
    shutdown: watch::Sender<bool>,
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            rooms: Mutex::new(HashMap::new()),
            shutdown,
        }
    }

    /// Listen to a group's room, creating it on first use.
    pub fn subscribe(&self, group_id: i64) -> broadcast::Receiver<ChatMessage> {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        // Rooms whose listeners have all gone are dropped lazily here
        rooms.retain(|_, tx| tx.receiver_count() > 0);
        rooms
            .entry(group_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Deliver a stored message to everyone in its group's room.
    /// Returns how many listeners received it.
    pub fn publish(&self, message: ChatMessage) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        match rooms.get(&message.group_id) {
            Some(tx) => tx.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// Number of rooms that currently have at least one listener.
    pub fn room_count(&self) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms.values().filter(|tx| tx.receiver_count() > 0).count()
    }

    /// Close every room and tell connected sockets to hang up.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        let closed = rooms.len();
        rooms.clear();
        info!(rooms = closed, "Chat hub shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinGroup { group_id: i64 },
    SendMessage { group_id: i64, text: String },
    LeaveGroup { group_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    JoinedGroup { group_id: i64 },
    LeftGroup { group_id: i64 },
    NewMessage { message: ChatMessage },
    Error { message: String },
}

impl ServerEvent {
    fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct WsParams {
    token: Option<String>,
}

/// GET /ws?token=... — authenticate, then upgrade to a chat socket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = params
        .token
        .or_else(|| auth::token_from_headers(&headers))
        .and_then(|token| auth::verify_token(&state.config.session_secret, &token));

    let Some(user) = user else {
        return api_error(StatusCode::UNAUTHORIZED, "Authentication error");
    };
    if state.chat.is_shut_down() {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, "Server is shutting down");
    }

    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: AppState, user: AuthUser, socket: WebSocket) {
    info!(user_id = user.id, "Chat client connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to encode chat event");
                    continue;
                }
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut rooms: HashMap<i64, JoinHandle<()>> = HashMap::new();
    let mut shutdown = state.chat.shutdown_signal();

    let already_closed = *shutdown.borrow_and_update();
    if !already_closed {
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_text(&state, user, text.as_str(), &tx, &mut rooms).await;
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum; binary frames are ignored
                    Some(Ok(_)) => {}
                },
                _ = shutdown.changed() => break,
            }
        }
    }

    for (_, task) in rooms.drain() {
        task.abort();
    }
    drop(tx);
    let _ = writer.await;

    info!(user_id = user.id, "Chat client disconnected");
}

async fn handle_client_text(
    state: &AppState,
    user: AuthUser,
    text: &str,
    tx: &mpsc::Sender<ServerEvent>,
    rooms: &mut HashMap<i64, JoinHandle<()>>,
) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(error = %e, "Unrecognized chat event");
            let _ = tx.send(ServerEvent::error("Unrecognized event")).await;
            return;
        }
    };

    let reply = match event {
        ClientEvent::JoinGroup { group_id } => {
            match member_group(state, group_id, user.id).await {
                Ok(_) => {
                    rooms.entry(group_id).or_insert_with(|| {
                        let receiver = state.chat.subscribe(group_id);
                        tokio::spawn(forward_room(receiver, tx.clone()))
                    });
                    debug!(user_id = user.id, group_id, "Joined chat room");
                    Some(ServerEvent::JoinedGroup { group_id })
                }
                Err(e) => Some(ServerEvent::error(e.to_string())),
            }
        }
        ClientEvent::LeaveGroup { group_id } => {
            if let Some(task) = rooms.remove(&group_id) {
                task.abort();
            }
            Some(ServerEvent::LeftGroup { group_id })
        }
        ClientEvent::SendMessage { group_id, text } => {
            send_chat_message(state, user, group_id, &text).await
        }
    };

    // Successful sends come back through the room, not as a direct reply
    if let Some(reply) = reply {
        let _ = tx.send(reply).await;
    }
}

async fn send_chat_message(
    state: &AppState,
    user: AuthUser,
    group_id: i64,
    text: &str,
) -> Option<ServerEvent> {
    let text = text.trim();
    if text.is_empty() {
        return Some(ServerEvent::error("Message text is required"));
    }
    if let Err(e) = member_group(state, group_id, user.id).await {
        return Some(ServerEvent::error(e.to_string()));
    }

    match state
        .db
        .insert_message(group_id, user.id, text, MessageKind::Text)
        .await
    {
        Ok(message) => {
            let delivered = state.chat.publish(message);
            debug!(group_id, delivered, "Chat message broadcast");
            None
        }
        Err(e) => {
            error!(error = %e, group_id, "Failed to store chat message");
            Some(ServerEvent::error("Failed to send message"))
        }
    }
}

async fn forward_room(mut receiver: broadcast::Receiver<ChatMessage>, out: mpsc::Sender<ServerEvent>) {
    loop {
        match receiver.recv().await {
            Ok(message) => {
                if out.send(ServerEvent::NewMessage { message }).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Chat socket fell behind, messages dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
