/// WebSocket carrying the board sync protocol for one open folder.
///
/// On connect the host sends a `refresh` with the last good payload, then
/// relays every host message the folder session produces. Text frames from
/// the client are decoded as `ClientMessage` and queued on the session.
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use mdboard_core::sync::{ClientMessage, HostMessage};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::api::{log_api_issue, ErrorResponse};
use crate::session::{FolderSession, SessionInput};
use crate::state::AppState;

pub fn sync_router() -> Router<AppState> {
    Router::new().route("/folders/{folder_id}/ws", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(folder_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.sessions.get(&folder_id) {
        Some(session) => ws
            .on_upgrade(move |socket| handle_socket(socket, session))
            .into_response(),
        None => {
            let status = StatusCode::NOT_FOUND;
            let error = format!("Folder not open: {}", folder_id);
            log_api_issue(status, "mdboard.sync_ws", &error);
            (status, Json(ErrorResponse { error })).into_response()
        }
    }
}

fn encode(message: &HostMessage) -> Option<Message> {
    match message.encode() {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            log::error!("[mdboard.sync_ws.encode] {}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, session: Arc<FolderSession>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let folder_id = session.id().to_string();

    // Subscribe before reading the snapshot so nothing published in between
    // is missed.
    let mut updates = session.subscribe();
    match session.snapshot() {
        Some(payload) => {
            if let Some(frame) = encode(&HostMessage::Refresh { payload }) {
                if ws_tx.send(frame).await.is_err() {
                    return;
                }
            }
        }
        None => {
            session.send(SessionInput::Refresh);
        }
    }
    log::info!("[mdboard.sync_ws] Client connected to {}", folder_id);

    // Write task: forward host messages to the socket
    let write_session = session.clone();
    let mut write_task = tokio::spawn(async move {
        loop {
            let message = match updates.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "[mdboard.sync_ws] Client lagged by {} message(s), resending snapshot",
                        skipped
                    );
                    match write_session.snapshot() {
                        Some(payload) => HostMessage::Refresh { payload },
                        None => continue,
                    }
                }
                Err(RecvError::Closed) => break,
            };
            let Some(frame) = encode(&message) else {
                continue;
            };
            if ws_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    // Read task: decode client messages and queue them on the session
    let read_session = session.clone();
    let read_folder = folder_id.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let parsed = match ClientMessage::decode(text.as_str()) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("[mdboard.sync_ws] Rejected message for {}: {}", read_folder, e);
                    continue;
                }
            };
            if !read_session.send(SessionInput::Client(parsed)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut write_task => { read_task.abort(); }
        _ = &mut read_task => { write_task.abort(); }
        _ = session.closed() => {
            read_task.abort();
            write_task.abort();
        }
    }

    log::info!("[mdboard.sync_ws] Client disconnected from {}", folder_id);
}
