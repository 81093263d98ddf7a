use axum::{
    extract::{Query, State},
    response::{sse::Event, Json, Sse},
};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::log_bridge::LogFilter;
use crate::state::AppState;

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let actual_port = state.live_port.lock().map(|p| *p).unwrap_or(state.port);
    Json(serde_json::json!({
        "status": "running",
        "port": actual_port,
        "bind_address": state.bind_address,
        "open_folders": state.sessions.list().len(),
    }))
}

pub async fn list_logs(Query(filter): Query<LogFilter>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "entries": crate::log_bridge::recent_entries(&filter),
        "filePath": crate::log_bridge::log_file_path(),
    }))
}

/// SSE stream of log entries, with a keep-alive comment every 30 seconds.
pub async fn stream_logs() -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = crate::log_bridge::subscribe();
    let entries = BroadcastStream::new(rx).filter_map(|item| {
        let entry = item.ok()?;
        let payload = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(payload)))
    });

    let keep_alive = IntervalStream::new(tokio::time::interval(Duration::from_secs(30)))
        .map(|_| Ok(Event::default().comment("keep-alive")));

    Sse::new(entries.merge(keep_alive))
}
