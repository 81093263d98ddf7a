/// Open folders.
///
/// Each folder gets one `FolderSession`: a blocking task that owns the
/// folder's `BoardHost` and handles client messages and watcher bursts one at
/// a time from a single channel. Host messages fan out to every connected
/// client through a broadcast channel; the last good payload is kept in a
/// watch channel for new connections and the REST surface.
use mdboard_core::board::BoardStore;
use mdboard_core::host::{BoardHost, HostShell};
use mdboard_core::storage::{folder_id_from_path, LayoutStore, StorageError};
use mdboard_core::sync::{ClientMessage, HostMessage};
use mdboard_core::trash::TrashBin;
use mdboard_core::types::{BoardPayload, TitlePolicy};
use mdboard_core::watcher::file_watcher::FolderWatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, watch};

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Everything a session needs besides its folder.
#[derive(Clone)]
pub struct SessionContext {
    pub layout: Arc<dyn LayoutStore>,
    pub policy: TitlePolicy,
    pub trash_dir: PathBuf,
    pub shell: Arc<dyn HostShell>,
    pub watch_files: bool,
}

#[derive(Debug)]
pub enum SessionInput {
    Client(ClientMessage),
    FsChanged(Vec<PathBuf>),
    /// Reload and broadcast, e.g. for a client that connected before the
    /// first payload existed.
    Refresh,
    Close,
}

pub struct FolderSession {
    id: String,
    folder: PathBuf,
    input: mpsc::UnboundedSender<SessionInput>,
    updates: broadcast::Sender<HostMessage>,
    snapshot: watch::Receiver<Option<BoardPayload>>,
    watcher: Mutex<Option<FolderWatcher>>,
}

impl FolderSession {
    /// Open the board store and start the session loop. Must be called from
    /// inside a tokio runtime.
    pub fn spawn(folder: &Path, ctx: &SessionContext) -> Result<Arc<Self>, StorageError> {
        let store = BoardStore::open(
            folder,
            ctx.layout.clone(),
            ctx.policy,
            TrashBin::new(ctx.trash_dir.clone()),
        )?;
        let id = store.folder_id().to_string();
        let folder = store.folder().to_path_buf();
        let host = BoardHost::new(store, ctx.shell.clone());

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (updates_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);

        let loop_updates = updates_tx.clone();
        let loop_id = id.clone();
        tokio::task::spawn_blocking(move || {
            run_session(host, input_rx, loop_updates, snapshot_tx);
            log::info!("[mdboard.session.close] Session {} stopped", loop_id);
        });

        let watcher = if ctx.watch_files {
            start_watcher(&id, &folder, input_tx.clone())
        } else {
            None
        };

        log::info!("[mdboard.session.open] Opened {} as {}", folder.display(), id);
        Ok(Arc::new(Self {
            id,
            folder,
            input: input_tx,
            updates: updates_tx,
            snapshot: snapshot_rx,
            watcher: Mutex::new(watcher),
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Queue an input. Returns false once the session has stopped.
    pub fn send(&self, input: SessionInput) -> bool {
        self.input.send(input).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostMessage> {
        self.updates.subscribe()
    }

    /// Last good payload, `None` until the first successful load.
    pub fn snapshot(&self) -> Option<BoardPayload> {
        self.snapshot.borrow().clone()
    }

    /// Wait for the first successful load. `None` if the session stopped
    /// before producing one.
    pub async fn wait_for_snapshot(&self) -> Option<BoardPayload> {
        let mut rx = self.snapshot.clone();
        let ready = rx.wait_for(|payload| payload.is_some()).await;
        ready.ok().and_then(|payload| Option::clone(&payload))
    }

    /// Resolves once the session loop has stopped.
    pub async fn closed(&self) {
        let mut rx = self.snapshot.clone();
        while rx.changed().await.is_ok() {}
    }

    /// Stop watching and end the loop after the in-flight input.
    pub fn close(&self) {
        match self.watcher.lock() {
            Ok(mut watcher) => {
                watcher.take();
            }
            Err(e) => log::warn!("[mdboard.session.close] Watcher lock poisoned: {}", e),
        }
        let _ = self.input.send(SessionInput::Close);
    }
}

fn run_session(
    mut host: BoardHost,
    mut input: mpsc::UnboundedReceiver<SessionInput>,
    updates: broadcast::Sender<HostMessage>,
    snapshot: watch::Sender<Option<BoardPayload>>,
) {
    publish(host.snapshot(), &updates, &snapshot);

    while let Some(next) = input.blocking_recv() {
        let messages = match next {
            SessionInput::Client(msg) => host.handle(msg),
            SessionInput::FsChanged(paths) => host.on_fs_change(&paths),
            SessionInput::Refresh => host.refresh_messages(),
            SessionInput::Close => break,
        };
        publish(messages, &updates, &snapshot);
    }
}

fn publish(
    messages: Vec<HostMessage>,
    updates: &broadcast::Sender<HostMessage>,
    snapshot: &watch::Sender<Option<BoardPayload>>,
) {
    for message in messages {
        if let HostMessage::Refresh { payload } = &message {
            snapshot.send_replace(Some(payload.clone()));
        }
        // No receivers is fine; the snapshot still moved forward.
        let _ = updates.send(message);
    }
}

fn start_watcher(
    id: &str,
    folder: &Path,
    input: mpsc::UnboundedSender<SessionInput>,
) -> Option<FolderWatcher> {
    let (fs_tx, mut fs_rx) = mpsc::unbounded_channel();
    let watcher = match FolderWatcher::new(id, folder, fs_tx) {
        Ok(watcher) => watcher,
        Err(e) => {
            log::warn!(
                "[mdboard.session.watch] Not watching {}: {}",
                folder.display(),
                e
            );
            return None;
        }
    };

    // Ends when the watcher (and with it the sender) is dropped.
    tokio::spawn(async move {
        while let Some(change) = fs_rx.recv().await {
            if input.send(SessionInput::FsChanged(change.paths)).is_err() {
                break;
            }
        }
    });
    Some(watcher)
}

/// All open sessions, keyed by folder id.
pub struct SessionRegistry {
    ctx: SessionContext,
    sessions: RwLock<HashMap<String, Arc<FolderSession>>>,
}

impl SessionRegistry {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open `folder`, or return the running session for it.
    pub fn open(&self, folder: &Path) -> Result<Arc<FolderSession>, StorageError> {
        if !folder.is_dir() {
            return Err(StorageError::InvalidFolder(folder.to_string_lossy().to_string()));
        }
        let canonical = std::fs::canonicalize(folder)?;
        let id = folder_id_from_path(&canonical);

        if let Some(existing) = self.get(&id) {
            return Ok(existing);
        }

        let session = FolderSession::spawn(&canonical, &self.ctx)?;
        let mut sessions = self.sessions.write().map_err(|_| StorageError::LockPoisoned)?;
        let kept = sessions.entry(id).or_insert_with(|| session.clone()).clone();
        if !Arc::ptr_eq(&kept, &session) {
            session.close();
        }
        Ok(kept)
    }

    pub fn get(&self, id: &str) -> Option<Arc<FolderSession>> {
        self.sessions.read().ok()?.get(id).cloned()
    }

    /// Open sessions, ordered by folder path.
    pub fn list(&self) -> Vec<Arc<FolderSession>> {
        let mut sessions: Vec<Arc<FolderSession>> = match self.sessions.read() {
            Ok(sessions) => sessions.values().cloned().collect(),
            Err(_) => return Vec::new(),
        };
        sessions.sort_by(|a, b| a.folder().cmp(b.folder()));
        sessions
    }

    pub fn close(&self, id: &str) -> bool {
        let removed = match self.sessions.write() {
            Ok(mut sessions) => sessions.remove(id),
            Err(_) => None,
        };
        match removed {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&self) {
        let drained: Vec<Arc<FolderSession>> = match self.sessions.write() {
            Ok(mut sessions) => sessions.drain().map(|(_, session)| session).collect(),
            Err(_) => return,
        };
        for session in drained {
            session.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdboard_core::client::ClientBoard;
    use mdboard_core::host::ShellError;
    use mdboard_core::storage::local::MemoryLayoutStore;
    use std::fs;
    use std::time::Duration;

    struct QuietShell;

    impl HostShell for QuietShell {
        fn prompt_title(&self, _status: &str) -> Result<Option<String>, ShellError> {
            Ok(Some("Prompted".to_string()))
        }
        fn confirm_delete(&self, _title: &str, _path: &Path) -> Result<bool, ShellError> {
            Ok(true)
        }
        fn open_preview(&self, _path: &Path) -> Result<(), ShellError> {
            Ok(())
        }
        fn open_editor(&self, _path: &Path) -> Result<(), ShellError> {
            Ok(())
        }
    }

    fn context(trash: &Path) -> SessionContext {
        SessionContext {
            layout: Arc::new(MemoryLayoutStore::new()),
            policy: TitlePolicy::FileStem,
            trash_dir: trash.to_path_buf(),
            shell: Arc::new(QuietShell),
            watch_files: false,
        }
    }

    async fn next_refresh(rx: &mut broadcast::Receiver<HostMessage>) -> BoardPayload {
        let wait = async {
            loop {
                if let HostMessage::Refresh { payload } = rx.recv().await.unwrap() {
                    return payload;
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait).await.unwrap()
    }

    #[tokio::test]
    async fn test_move_card_broadcasts_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let trash = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.md"),
            "---\ntitle: A\nstatus: Todo\n---\nbody\n",
        )
        .unwrap();

        let registry = SessionRegistry::new(context(trash.path()));
        let session = registry.open(dir.path()).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), session.wait_for_snapshot())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.count_in("Todo"), 1);

        let mut rx = session.subscribe();
        let id = first.cards[0].id.clone();
        assert!(session.send(SessionInput::Client(ClientMessage::MoveCard {
            id,
            status: "Done".to_string(),
        })));

        let moved = next_refresh(&mut rx).await;
        assert_eq!(moved.count_in("Done"), 1);
        assert!(moved.columns.contains(&"Done".to_string()));
        assert_eq!(session.snapshot(), Some(moved));

        let text = fs::read_to_string(dir.path().join("a.md")).unwrap();
        assert!(text.contains("status: Done"));
        assert!(text.ends_with("body\n"));
    }

    #[tokio::test]
    async fn test_failed_mutation_notifies_and_resends_payload() {
        let dir = tempfile::tempdir().unwrap();
        let trash = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(context(trash.path()));
        let session = registry.open(dir.path()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), session.wait_for_snapshot())
            .await
            .unwrap()
            .unwrap();

        let mut rx = session.subscribe();
        session.send(SessionInput::Client(ClientMessage::DeleteColumn {
            status: mdboard_core::types::DEFAULT_STATUS.to_string(),
        }));

        let notice = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(notice, HostMessage::Notice { .. }));
        let payload = next_refresh(&mut rx).await;
        assert_eq!(payload.columns, vec![mdboard_core::types::DEFAULT_STATUS.to_string()]);
    }

    #[tokio::test]
    async fn test_client_create_and_delete_through_desktop_shell() {
        let dir = tempfile::tempdir().unwrap();
        let trash = tempfile::tempdir().unwrap();
        let ctx = SessionContext {
            shell: Arc::new(crate::shell::DesktopShell::new(Some("true".to_string()))),
            ..context(trash.path())
        };
        let registry = SessionRegistry::new(ctx);
        let session = registry.open(dir.path()).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), session.wait_for_snapshot())
            .await
            .unwrap()
            .unwrap();

        let mut client = ClientBoard::new(first);
        let mut rx = session.subscribe();
        let create = client.create_card("Doing", "Write report").unwrap();
        assert!(session.send(SessionInput::Client(create)));

        let created = next_refresh(&mut rx).await;
        assert_eq!(created.count_in("Doing"), 1);
        assert_eq!(created.cards[0].title, "Write report");
        assert!(dir.path().join("write-report.md").is_file());
        client.apply_host(HostMessage::Refresh { payload: created.clone() });

        assert!(client.request_delete(&created.cards[0].id));
        let delete = client.confirm_delete().unwrap();
        assert!(session.send(SessionInput::Client(delete)));

        let emptied = next_refresh(&mut rx).await;
        assert!(emptied.cards.is_empty());
        assert!(!dir.path().join("write-report.md").exists());
    }

    #[tokio::test]
    async fn test_same_folder_shares_session() {
        let dir = tempfile::tempdir().unwrap();
        let trash = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(context(trash.path()));

        let first = registry.open(dir.path()).unwrap();
        let nested = dir.path().join(".");
        let second = registry.open(&nested).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.list().len(), 1);

        assert!(registry.close(first.id()));
        assert!(!registry.close(first.id()));
        assert!(registry.get(first.id()).is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("note.md");
        fs::write(&file, "x").unwrap();

        let registry = SessionRegistry::new(context(dir.path()));
        assert!(matches!(
            registry.open(&file),
            Err(StorageError::InvalidFolder(_))
        ));
        assert!(registry.list().is_empty());
    }
}
