pub mod local;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Key-value store for per-folder column layout.
/// Implementations: JsonLayoutStore (single JSON file), MemoryLayoutStore (tests, ephemeral).
pub trait LayoutStore: Send + Sync {
    /// Read a string list. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, StorageError>;

    /// Replace a string list.
    fn set(&self, key: &str, value: &[String]) -> Result<(), StorageError>;
}

/// The three per-folder layout lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKey {
    /// User-chosen column order.
    ColumnOrder,
    /// Columns the user removed; hidden until a card claims them again.
    DeletedColumns,
    /// Every column ever seen, so empty columns survive reloads.
    PersistedColumns,
}

impl LayoutKey {
    pub fn prefix(self) -> &'static str {
        match self {
            LayoutKey::ColumnOrder => "columnOrder",
            LayoutKey::DeletedColumns => "deletedColumns",
            LayoutKey::PersistedColumns => "persistedColumns",
        }
    }

    /// Store key for this list in `folder`, e.g. `columnOrder:/home/me/tasks`.
    pub fn for_folder(self, folder: &Path) -> String {
        format!("{}:{}", self.prefix(), folder.to_string_lossy())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Cannot read folder {folder:?}: {source}")]
    FolderUnreadable {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {0}")]
    InvalidFolder(String),

    #[error("Corrupt layout store {path:?}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Layout store lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Deterministic folder ID from its path: SHA-256, first 12 hex chars.
pub fn folder_id_from_path(folder: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(folder.to_string_lossy().as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..6])
}

/// Write via a sibling temp file, fsync, rename, then fsync the directory.
/// Readers never observe a half-written file.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("mdboard-tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_keys() {
        let folder = Path::new("/home/me/tasks");
        assert_eq!(LayoutKey::ColumnOrder.for_folder(folder), "columnOrder:/home/me/tasks");
        assert_eq!(LayoutKey::DeletedColumns.for_folder(folder), "deletedColumns:/home/me/tasks");
        assert_eq!(
            LayoutKey::PersistedColumns.for_folder(folder),
            "persistedColumns:/home/me/tasks"
        );
    }

    #[test]
    fn test_folder_id_is_stable_and_short() {
        let a = folder_id_from_path(Path::new("/home/me/tasks"));
        let b = folder_id_from_path(Path::new("/home/me/tasks"));
        let c = folder_id_from_path(Path::new("/home/me/other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 12);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.md");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("mdboard-tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
