/// Recoverable deletion: cards are moved into a trash directory instead of
/// being unlinked.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::naming::unique_file_name;

#[derive(Debug, Clone)]
pub struct TrashBin {
    dir: PathBuf,
}

impl TrashBin {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Move `path` into the trash and return where it ended up.
    ///
    /// Name clashes get a `-{timestamp}` tag, then the usual numbered suffix.
    /// Falls back to copy + remove when rename crosses filesystems.
    pub fn discard(&self, path: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "card".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        let target = if self.dir.join(file_name(&stem, &ext)).exists() {
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            unique_file_name(&self.dir, &format!("{}-{}", stem, stamp), &ext)
        } else {
            self.dir.join(file_name(&stem, &ext))
        };

        if let Err(e) = fs::rename(path, &target) {
            if e.kind() == io::ErrorKind::NotFound {
                return Err(e);
            }
            log::debug!(
                "[mdboard.trash.discard] Rename failed ({}), copying {:?} instead",
                e,
                path
            );
            fs::copy(path, &target)?;
            fs::remove_file(path)?;
        }

        log::info!("[mdboard.trash.discard] Moved {:?} to {:?}", path, target);
        Ok(target)
    }
}

fn file_name(stem: &str, ext: &str) -> String {
    if ext.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, ext)
    }
}
