/// HTTP server: spawns axum on a background tokio task.
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::api_router;
use crate::state::AppState;
use crate::sync_ws::sync_router;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api_router()
        .merge(sync_router())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve. Returns the port actually bound.
pub async fn spawn_server(state: AppState) -> Result<u16, Box<dyn std::error::Error>> {
    let port = state.port;
    let bind_addr = state.bind_address.clone();
    let live_port = state.live_port.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind_addr, port)).await?;
    let actual_port = listener.local_addr()?.port();
    if let Ok(mut lp) = live_port.lock() {
        *lp = actual_port;
    }

    log::info!(
        "[mdboard.server] Listening on http://{}:{}",
        bind_addr,
        actual_port
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            log::error!("[mdboard.server] HTTP server exited with error: {}", e);
        }
    });

    Ok(actual_port)
}
