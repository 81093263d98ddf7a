use axum::{http::StatusCode, routing::get, Router};
use serde::Serialize;

mod events;
mod folders;

use crate::state::AppState;

/// Axum REST API routes.
///
///   GET    /status                 -> health check, port, open folder count
///   GET    /folders                -> list open folders
///   POST   /folders                -> open a folder by path
///   DELETE /folders/:folderId      -> close a folder session
///   GET    /folders/:folderId/board -> last good board payload
///   GET    /logs                   -> recent backend log entries
///   GET    /logs/stream            -> SSE stream of backend log entries
///
/// The sync protocol WebSocket lives in `sync_ws`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(events::status))
        .route(
            "/folders",
            get(folders::list_folders).post(folders::open_folder),
        )
        .route(
            "/folders/{folder_id}",
            axum::routing::delete(folders::close_folder),
        )
        .route("/folders/{folder_id}/board", get(folders::get_board))
        .route("/logs", get(events::list_logs))
        .route("/logs/stream", get(events::stream_logs))
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}
