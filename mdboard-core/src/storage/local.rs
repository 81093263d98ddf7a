/// Layout store backends.
///
/// `JsonLayoutStore` keeps every folder's column lists in one JSON object on
/// disk, rewritten atomically on each `set`. A missing or corrupt file starts
/// empty rather than failing, so a damaged store costs layout, never cards.
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{atomic_write, LayoutStore, StorageError};

type Entries = BTreeMap<String, Vec<String>>;

/// File-backed layout store.
pub struct JsonLayoutStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl JsonLayoutStore {
    /// Open the store at `path`, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let entries = Self::load_from_file(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_file(path: &Path) -> io::Result<Entries> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "[mdboard.layout.load] No layout store at {}, starting empty",
                    path.display()
                );
                return Ok(Entries::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => {
                log::info!(
                    "[mdboard.layout.load] Loaded {} layout entries from {}",
                    entries.len(),
                    path.display()
                );
                Ok(entries)
            }
            Err(e) => {
                log::warn!(
                    "[mdboard.layout.load] Corrupt layout store at {}: {}, starting empty",
                    path.display(),
                    e
                );
                Ok(Entries::new())
            }
        }
    }

    fn save_to_file(&self, entries: &Entries) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| StorageError::CorruptStore {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        atomic_write(&self.path, &json)?;
        log::debug!(
            "[mdboard.layout.save] Saved {} layout entries to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

impl LayoutStore for JsonLayoutStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[String]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let previous = entries.insert(key.to_string(), value.to_vec());
        if let Err(e) = self.save_to_file(&entries) {
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// In-memory layout store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryLayoutStore {
    entries: RwLock<Entries>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[String]) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
