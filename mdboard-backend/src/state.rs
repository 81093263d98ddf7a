/// Shared application state passed to axum handlers.
use std::sync::{Arc, Mutex};

use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    /// Configured port; 0 asks the OS for one.
    pub port: u16,
    pub bind_address: String,
    /// Port actually bound, set once the listener is up.
    pub live_port: Arc<Mutex<u16>>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionRegistry>, port: u16, bind_address: String) -> Self {
        Self {
            sessions,
            port,
            bind_address,
            live_port: Arc::new(Mutex::new(port)),
        }
    }
}
