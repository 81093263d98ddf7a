/// Folder watcher using notify-debouncer-full.
///
/// Watches the top level of one card folder and forwards each debounced burst
/// of `.md` changes as a single FolderChangeEvent. 500ms debounce window for
/// macOS FSEvents and cloud sync stability.
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::mpsc;

use super::types::FolderChangeEvent;

const DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

/// Dropping the watcher stops event delivery.
pub struct FolderWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher, RecommendedCache>,
    folder: PathBuf,
}

impl FolderWatcher {
    pub fn new(
        folder_id: &str,
        folder: &Path,
        tx: mpsc::UnboundedSender<FolderChangeEvent>,
    ) -> Result<Self, notify::Error> {
        let folder = std::fs::canonicalize(folder).unwrap_or_else(|_| folder.to_path_buf());
        let id = folder_id.to_string();

        let mut debouncer = new_debouncer(
            DEBOUNCE_DURATION,
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => forward_events(&id, events, &tx),
                Err(errors) => {
                    for e in errors {
                        log::error!("[mdboard.watcher.error] Watch error: {}", e);
                    }
                }
            },
        )?;

        debouncer.watch(&folder, RecursiveMode::NonRecursive)?;
        log::info!(
            "[mdboard.watcher.folder] Watching folder {} at {:?}",
            folder_id,
            folder
        );

        Ok(Self {
            _debouncer: debouncer,
            folder,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

fn forward_events(
    folder_id: &str,
    events: Vec<DebouncedEvent>,
    tx: &mpsc::UnboundedSender<FolderChangeEvent>,
) {
    let paths = events.into_iter().flat_map(|event| event.event.paths);
    let Some(change) = FolderChangeEvent::from_paths(folder_id, paths) else {
        return;
    };

    log::debug!(
        "[mdboard.watcher.change] {} card file(s) changed in folder {}",
        change.paths.len(),
        folder_id
    );
    if tx.send(change).is_err() {
        log::debug!("[mdboard.watcher.send] Session closed, dropping event");
    }
}
