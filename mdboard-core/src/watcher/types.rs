/// Event and fingerprint types shared by the folder watcher and the board host.
use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::types::is_card_file_name;

/// SHA-256 of file content with CRLF folded to LF.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(pub String);

impl ContentFingerprint {
    pub fn from_content(content: &str) -> Self {
        let normalized = content.replace("\r\n", "\n");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

/// One debounced burst of changes to card files in a watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderChangeEvent {
    pub folder_id: String,
    /// Changed `.md` paths, deduplicated, in arrival order.
    pub paths: Vec<PathBuf>,
}

impl FolderChangeEvent {
    /// Keep only card files; `None` when nothing relevant is left.
    pub fn from_paths(folder_id: &str, paths: impl IntoIterator<Item = PathBuf>) -> Option<Self> {
        let mut relevant: Vec<PathBuf> = Vec::new();
        for path in paths {
            let is_card = path
                .file_name()
                .map(|name| is_card_file_name(&name.to_string_lossy()))
                .unwrap_or(false);
            if is_card && !relevant.contains(&path) {
                relevant.push(path);
            }
        }

        if relevant.is_empty() {
            None
        } else {
            Some(Self {
                folder_id: folder_id.to_string(),
                paths: relevant,
            })
        }
    }
}
