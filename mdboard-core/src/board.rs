/// Board store: canonical state for one open card folder.
///
/// Cards come from the files on every refresh; column layout comes from the
/// layout store. Every mutation writes first, then refreshes, and returns the
/// resulting payload. A failed refresh leaves the last good payload in place.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::columns::{dedupe, discover_columns, normalize_order, resolve_columns};
use crate::frontmatter::{self, FIELD_STATUS};
use crate::loader::load_cards;
use crate::naming::{slugify, unique_file_name};
use crate::storage::{atomic_write, folder_id_from_path, LayoutKey, LayoutStore, StorageError};
use crate::trash::TrashBin;
use crate::types::{is_card_file_name, BoardPayload, TitlePolicy, CARD_EXTENSION, DEFAULT_STATUS};
use crate::watcher::self_write::SelfWriteTracker;

/// Attempts at claiming a fresh file name when another process races us.
const CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("The \"{0}\" column cannot be deleted")]
    DefaultColumn(String),

    #[error("Column \"{status}\" still contains {count} card(s)")]
    ColumnNotEmpty { status: String, count: usize },

    #[error("Card title cannot be empty")]
    EmptyTitle,

    #[error("Status cannot be empty")]
    EmptyStatus,

    #[error("Unknown card: {0}")]
    UnknownCard(String),

    #[error("Frontmatter of {0:?} is not valid YAML; fix it before moving the card")]
    MalformedFrontmatter(PathBuf),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<io::Error> for BoardError {
    fn from(e: io::Error) -> Self {
        BoardError::Storage(StorageError::Io(e))
    }
}

pub struct BoardStore {
    folder: PathBuf,
    folder_id: String,
    layout: Arc<dyn LayoutStore>,
    policy: TitlePolicy,
    trash: TrashBin,
    last_payload: Option<BoardPayload>,
    self_writes: SelfWriteTracker,
}

impl BoardStore {
    /// Open `folder`, which must be an existing directory. Does not load
    /// anything yet; call [`BoardStore::refresh`].
    pub fn open(
        folder: &Path,
        layout: Arc<dyn LayoutStore>,
        policy: TitlePolicy,
        trash: TrashBin,
    ) -> Result<Self, StorageError> {
        if !folder.is_dir() {
            return Err(StorageError::InvalidFolder(folder.to_string_lossy().to_string()));
        }
        let folder = fs::canonicalize(folder)?;
        let folder_id = folder_id_from_path(&folder);

        Ok(Self {
            folder,
            folder_id,
            layout,
            policy,
            trash,
            last_payload: None,
            self_writes: SelfWriteTracker::new(),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Last successfully built payload, if any refresh has succeeded.
    pub fn current_payload(&self) -> Option<&BoardPayload> {
        self.last_payload.as_ref()
    }

    /// Reload cards and rebuild the payload.
    pub fn refresh(&mut self) -> Result<BoardPayload, BoardError> {
        let cards = match load_cards(&self.folder, self.policy) {
            Ok(cards) => cards,
            Err(e) => {
                log::error!("[mdboard.board.refresh] Failed to load {:?}: {}", self.folder, e);
                return Err(e.into());
            }
        };

        let discovered = discover_columns(&cards);

        let previous = self.layout_get(LayoutKey::PersistedColumns)?;
        let superset = dedupe(previous.iter().flatten().chain(discovered.iter()));
        if previous.as_ref() != Some(&superset) {
            self.layout_set(LayoutKey::PersistedColumns, &superset)?;
        }

        let deleted = self.layout_get(LayoutKey::DeletedColumns)?;
        let columns = resolve_columns(&discovered, Some(superset.as_slice()), deleted.as_deref());
        let columns = match self.layout_get(LayoutKey::ColumnOrder)? {
            Some(order) => normalize_order(&order, &columns),
            None => columns,
        };

        let payload = BoardPayload::new(&self.folder, columns, &cards);
        log::debug!(
            "[mdboard.board.refresh] {}: {} cards in {} columns",
            self.folder_id,
            payload.cards.len(),
            payload.columns.len()
        );
        self.last_payload = Some(payload.clone());
        Ok(payload)
    }

    /// Rewrite a card's `status` field, keeping the rest of the file intact.
    pub fn move_card(&mut self, card_id: &str, next_status: &str) -> Result<BoardPayload, BoardError> {
        let status = next_status.trim();
        if status.is_empty() {
            return Err(BoardError::EmptyStatus);
        }
        let path = self.card_file(card_id)?;

        let text = fs::read_to_string(&path)?;
        let current = frontmatter::parse(&text)
            .trimmed_field(FIELD_STATUS)
            .unwrap_or(DEFAULT_STATUS)
            .to_string();

        if current == status {
            log::debug!("[mdboard.board.move] {:?} already in {:?}", path, status);
        } else {
            let Some(updated) = frontmatter::rewrite_status(&text, status) else {
                log::warn!("[mdboard.board.move] Refusing to rewrite {:?}: unreadable frontmatter", path);
                return Err(BoardError::MalformedFrontmatter(path));
            };
            self.self_writes.register(&path, &updated);
            if let Err(e) = atomic_write(&path, &updated) {
                self.self_writes.forget(&path);
                return Err(e.into());
            }
            log::info!("[mdboard.board.move] {:?}: {:?} -> {:?}", path, current, status);
        }

        self.introduce_status(status)?;
        self.refresh()
    }

    /// Create a new card file and return its path with the refreshed payload.
    /// A blank status lands the card in the default column.
    pub fn create_card(
        &mut self,
        status: Option<&str>,
        title: &str,
    ) -> Result<(PathBuf, BoardPayload), BoardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(BoardError::EmptyTitle);
        }
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_STATUS);

        let content = frontmatter::new_card_document(title, status);
        let stem = slugify(title);
        let path = self.write_new_file(&stem, &content)?;
        log::info!("[mdboard.board.create] Created {:?} in {:?}", path, status);

        self.introduce_status(status)?;

        let payload = self.refresh()?;
        Ok((path, payload))
    }

    /// Move a card file to the trash.
    pub fn delete_card(&mut self, card_id: &str) -> Result<BoardPayload, BoardError> {
        let path = self.card_file(card_id)?;
        self.self_writes.forget(&path);
        self.trash.discard(&path)?;
        self.refresh()
    }

    /// Persist a new column order. Unknown entries are dropped, missing ones
    /// appended, the default column stays first.
    pub fn reorder_columns(&mut self, new_order: &[String]) -> Result<BoardPayload, BoardError> {
        let current = match &self.last_payload {
            Some(payload) => payload.columns.clone(),
            None => self.refresh()?.columns,
        };
        let ordered = normalize_order(new_order, &current);
        self.layout_set(LayoutKey::ColumnOrder, &ordered)?;
        log::info!("[mdboard.board.reorder] {}: {:?}", self.folder_id, ordered);
        self.refresh()
    }

    /// Remove an empty, non-default column from the layout.
    pub fn delete_column(&mut self, status: &str) -> Result<BoardPayload, BoardError> {
        let status = status.trim();
        if status.is_empty() {
            return Err(BoardError::EmptyStatus);
        }
        if status == DEFAULT_STATUS {
            return Err(BoardError::DefaultColumn(status.to_string()));
        }

        let cards = load_cards(&self.folder, self.policy)?;
        let count = cards.iter().filter(|card| card.status == status).count();
        if count > 0 {
            return Err(BoardError::ColumnNotEmpty {
                status: status.to_string(),
                count,
            });
        }

        if let Some(mut order) = self.layout_get(LayoutKey::ColumnOrder)? {
            order.retain(|s| s != status);
            self.layout_set(LayoutKey::ColumnOrder, &order)?;
        }

        let mut deleted = self.layout_get(LayoutKey::DeletedColumns)?.unwrap_or_default();
        if !deleted.iter().any(|s| s == status) {
            deleted.push(status.to_string());
            self.layout_set(LayoutKey::DeletedColumns, &deleted)?;
        }

        if let Some(mut persisted) = self.layout_get(LayoutKey::PersistedColumns)? {
            persisted.retain(|s| s != status);
            self.layout_set(LayoutKey::PersistedColumns, &persisted)?;
        }

        log::info!("[mdboard.board.delete_column] {}: removed {:?}", self.folder_id, status);
        self.refresh()
    }

    /// Whether `path` currently holds content this store just wrote.
    /// A match is consumed, so each write suppresses exactly one event.
    pub fn check_self_write(&mut self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(content) => self.self_writes.check_and_consume(path, &content),
            Err(_) => false,
        }
    }

    /// Resolve a card id to its file, which must be a `.md` file directly
    /// inside the folder.
    pub fn card_file(&self, card_id: &str) -> Result<PathBuf, BoardError> {
        let path = PathBuf::from(card_id);
        let inside = path.parent() == Some(self.folder.as_path());
        let is_card = path
            .file_name()
            .map(|name| is_card_file_name(&name.to_string_lossy()))
            .unwrap_or(false);

        if inside && is_card && path.is_file() {
            Ok(path)
        } else {
            log::warn!("[mdboard.board.card] Rejecting card id {:?}", card_id);
            Err(BoardError::UnknownCard(card_id.to_string()))
        }
    }

    /// A status the user explicitly targets is no longer deleted.
    fn introduce_status(&self, status: &str) -> Result<(), BoardError> {
        if let Some(mut deleted) = self.layout_get(LayoutKey::DeletedColumns)? {
            let before = deleted.len();
            deleted.retain(|s| s != status);
            if deleted.len() != before {
                self.layout_set(LayoutKey::DeletedColumns, &deleted)?;
            }
        }
        Ok(())
    }

    fn write_new_file(&mut self, stem: &str, content: &str) -> Result<PathBuf, BoardError> {
        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let path = unique_file_name(&self.folder, stem, CARD_EXTENSION);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    self.self_writes.register(&path, content);
                    file.write_all(content.as_bytes())?;
                    file.sync_all()?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("[mdboard.board.create] {:?} appeared concurrently, retrying", path);
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"))
            .into())
    }

    fn layout_get(&self, key: LayoutKey) -> Result<Option<Vec<String>>, StorageError> {
        self.layout.get(&key.for_folder(&self.folder))
    }

    fn layout_set(&self, key: LayoutKey, value: &[String]) -> Result<(), StorageError> {
        self.layout.set(&key.for_folder(&self.folder), value)
    }
}
