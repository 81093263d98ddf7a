/// Host-side dispatcher: turns client messages and file system changes into
/// board store operations and the host messages to send back.
///
/// Anything that needs the user or the desktop (title prompt, delete
/// confirmation, opening files) goes through `HostShell`.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::board::{BoardError, BoardStore};
use crate::sync::{ClientMessage, HostMessage};
use crate::types::{is_card_file_name, BoardPayload, DEFAULT_STATUS};

/// Desktop integration consumed by the host.
pub trait HostShell: Send + Sync {
    /// Ask for a new card's title. `Ok(None)` means the user cancelled.
    fn prompt_title(&self, status: &str) -> Result<Option<String>, ShellError>;

    /// Ask before trashing a card.
    fn confirm_delete(&self, title: &str, path: &Path) -> Result<bool, ShellError>;

    /// Show a card read-only, next to the board.
    fn open_preview(&self, path: &Path) -> Result<(), ShellError>;

    /// Open a card for editing.
    fn open_editor(&self, path: &Path) -> Result<(), ShellError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Failed to launch {command}: {reason}")]
    Launch { command: String, reason: String },

    #[error("Not supported by this shell: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct BoardHost {
    store: BoardStore,
    shell: Arc<dyn HostShell>,
}

impl BoardHost {
    pub fn new(store: BoardStore, shell: Arc<dyn HostShell>) -> Self {
        Self { store, shell }
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    /// Snapshot for a newly connected client: the last good payload, or a
    /// fresh load if there is none yet.
    pub fn snapshot(&mut self) -> Vec<HostMessage> {
        if let Some(payload) = self.store.current_payload() {
            return vec![HostMessage::Refresh {
                payload: payload.clone(),
            }];
        }
        self.refresh_messages()
    }

    /// Reload from disk and report the result.
    pub fn refresh_messages(&mut self) -> Vec<HostMessage> {
        match self.store.refresh() {
            Ok(payload) => vec![HostMessage::Refresh { payload }],
            Err(e) => vec![HostMessage::error(format!("Could not reload the board: {}", e))],
        }
    }

    /// Handle one client message.
    pub fn handle(&mut self, msg: ClientMessage) -> Vec<HostMessage> {
        log::debug!("[mdboard.host.handle] {} on {}", msg.kind(), self.store.folder_id());

        match msg {
            ClientMessage::MoveCard { id, status } => {
                let result = self.store.move_card(&id, &status);
                self.mutation_result(result)
            }
            ClientMessage::OpenCard { id } => self.open_card(&id, false),
            ClientMessage::EditCard { id } => self.open_card(&id, true),
            ClientMessage::CreateCard { status, title } => self.create_card(status, title),
            ClientMessage::DeleteCard { id } => self.delete_card(&id),
            ClientMessage::ReorderColumns { columns } => {
                let result = self.store.reorder_columns(&columns);
                self.mutation_result(result)
            }
            ClientMessage::DeleteColumn { status } => {
                let result = self.store.delete_column(&status);
                self.mutation_result(result)
            }
            ClientMessage::Unknown => {
                log::debug!("[mdboard.host.handle] Ignoring unknown message type");
                Vec::new()
            }
        }
    }

    /// React to a debounced burst of file changes in the folder.
    /// Our own writes are recognised by content and skipped.
    pub fn on_fs_change(&mut self, paths: &[PathBuf]) -> Vec<HostMessage> {
        let external = paths
            .iter()
            .filter(|path| {
                path.file_name()
                    .map(|name| is_card_file_name(&name.to_string_lossy()))
                    .unwrap_or(false)
            })
            .filter(|path| !self.store.check_self_write(path))
            .count();

        if external == 0 {
            log::debug!("[mdboard.host.fs] Only self-writes in this batch, skipping refresh");
            return Vec::new();
        }
        log::info!(
            "[mdboard.host.fs] {} external change(s) in {}, reloading",
            external,
            self.store.folder_id()
        );
        self.refresh_messages()
    }

    fn open_card(&self, id: &str, editable: bool) -> Vec<HostMessage> {
        let path = match self.store.card_file(id) {
            Ok(path) => path,
            Err(e) => return vec![HostMessage::warning(e.to_string())],
        };
        let result = if editable {
            self.shell.open_editor(&path)
        } else {
            self.shell.open_preview(&path)
        };
        match result {
            Ok(()) => Vec::new(),
            Err(e) => {
                log::warn!("[mdboard.host.open] {:?}: {}", path, e);
                vec![HostMessage::error(format!("Could not open card: {}", e))]
            }
        }
    }

    fn create_card(&mut self, status: Option<String>, title: Option<String>) -> Vec<HostMessage> {
        let status = status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STATUS)
            .to_string();

        let title = match title {
            Some(title) => title,
            None => match self.shell.prompt_title(&status) {
                Ok(Some(title)) => title,
                Ok(None) => return Vec::new(),
                Err(e) => return vec![HostMessage::error(format!("Could not ask for a title: {}", e))],
            },
        };

        let (path, payload) = match self.store.create_card(Some(&status), &title) {
            Ok(created) => created,
            Err(e) => return self.mutation_result(Err(e)),
        };

        let mut messages = vec![HostMessage::Refresh { payload }];
        if let Err(e) = self.shell.open_editor(&path) {
            log::warn!("[mdboard.host.create] Created {:?} but could not open it: {}", path, e);
            messages.push(HostMessage::warning(format!("Card created but could not be opened: {}", e)));
        }
        messages
    }

    fn delete_card(&mut self, id: &str) -> Vec<HostMessage> {
        let path = match self.store.card_file(id) {
            Ok(path) => path,
            Err(e) => return self.mutation_result(Err(e)),
        };
        let title = self
            .store
            .current_payload()
            .and_then(|payload| payload.card(id))
            .map(|card| card.title.clone())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        match self.shell.confirm_delete(&title, &path) {
            Ok(true) => {}
            Ok(false) => return Vec::new(),
            Err(e) => return vec![HostMessage::error(format!("Could not confirm deletion: {}", e))],
        }

        let result = self.store.delete_card(id);
        self.mutation_result(result)
    }

    /// A failed mutation reports a notice and resends the last good payload so
    /// the client drops its optimistic change.
    fn mutation_result(&self, result: Result<BoardPayload, BoardError>) -> Vec<HostMessage> {
        match result {
            Ok(payload) => vec![HostMessage::Refresh { payload }],
            Err(e) => {
                let notice = match &e {
                    BoardError::ColumnNotEmpty { status, count } => HostMessage::warning(format!(
                        "Move or delete the {} card(s) in \"{}\" before deleting the column.",
                        count, status
                    )),
                    BoardError::Storage(_) => {
                        log::error!("[mdboard.host.mutation] {}", e);
                        HostMessage::error(e.to_string())
                    }
                    _ => HostMessage::warning(e.to_string()),
                };
                let mut messages = vec![notice];
                if let Some(payload) = self.store.current_payload() {
                    messages.push(HostMessage::Refresh {
                        payload: payload.clone(),
                    });
                }
                messages
            }
        }
    }
}
