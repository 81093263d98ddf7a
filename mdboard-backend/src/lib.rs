/// mdboard backend: config loading, folder selection, folder sessions and the
/// HTTP/WebSocket server that carries the board sync protocol.
pub mod api;
pub mod config;
pub mod folder_picker;
pub mod log_bridge;
pub mod server;
pub mod session;
pub mod shell;
pub mod state;
pub mod sync_ws;

use crate::config::BoardConfig;
use crate::folder_picker::{pick_folder_interactive, PickerError};
use crate::session::{SessionContext, SessionRegistry};
use crate::shell::DesktopShell;
use crate::state::AppState;
use mdboard_core::storage::local::JsonLayoutStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line overrides for a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub folders: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub port: Option<u16>,
    pub watch: bool,
}

pub fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = options
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);
    let folders = select_folders(&options.folders, &config)?;

    let layout_path = config.layout_store_path();
    let layout = Arc::new(JsonLayoutStore::open(&layout_path)?);
    log::info!("[mdboard.startup] Column layout store at {}", layout_path.display());

    let ctx = SessionContext {
        layout,
        policy: config.title_policy,
        trash_dir: config.trash_path(),
        shell: Arc::new(DesktopShell::new(config.editor_command.clone())),
        watch_files: options.watch,
    };
    let registry = Arc::new(SessionRegistry::new(ctx));
    let port = options.port.unwrap_or(config.port);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(registry, folders, port, config.bind_address.clone()))
}

async fn serve(
    registry: Arc<SessionRegistry>,
    folders: Vec<PathBuf>,
    port: u16,
    bind_address: String,
) -> Result<(), Box<dyn std::error::Error>> {
    for folder in &folders {
        if let Err(e) = registry.open(folder) {
            log::warn!("[mdboard.startup] Failed to open {}: {}", folder.display(), e);
        }
    }

    let state = AppState::new(registry.clone(), port, bind_address.clone());
    let actual_port = server::spawn_server(state).await?;
    for session in registry.list() {
        log::info!(
            "[mdboard.startup] {} -> ws://{}:{}/folders/{}/ws",
            session.folder().display(),
            bind_address,
            actual_port,
            session.id()
        );
    }

    tokio::signal::ctrl_c().await?;
    log::info!("[mdboard.shutdown] Closing {} folder(s)", registry.list().len());
    registry.close_all();
    Ok(())
}

/// Folders named on the command line win; otherwise the configured ones that
/// still exist; otherwise ask.
fn select_folders(cli: &[PathBuf], config: &BoardConfig) -> Result<Vec<PathBuf>, PickerError> {
    let mut folders = Vec::new();
    for candidate in cli {
        folders.push(pick_folder_interactive(Some(candidate))?);
    }

    if folders.is_empty() {
        for entry in &config.folders {
            let path = PathBuf::from(entry);
            if path.is_dir() {
                folders.push(path);
            } else {
                log::warn!("[mdboard.startup] Configured folder missing: {}", entry);
            }
        }
    }

    if folders.is_empty() {
        folders.push(pick_folder_interactive(None)?);
    }
    Ok(folders)
}
