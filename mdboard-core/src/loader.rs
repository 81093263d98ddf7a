/// Card loader: scans a folder for markdown files and turns each into a Card.
///
/// Only the top level of the folder is scanned. A file that cannot be read
/// (vanished between listing and reading, permissions, ...) is logged and left
/// out of this pass; failing to list the folder itself is an error.
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::frontmatter::{self, FIELD_STATUS, FIELD_SUMMARY, FIELD_TITLE};
use crate::storage::StorageError;
use crate::types::{is_card_file_name, Card, TitlePolicy, DEFAULT_STATUS};

/// Load every card in `folder`, sorted by title.
pub fn load_cards(folder: &Path, policy: TitlePolicy) -> Result<Vec<Card>, StorageError> {
    let entries = fs::read_dir(folder).map_err(|e| StorageError::FolderUnreadable {
        folder: folder.to_path_buf(),
        source: e,
    })?;

    let mut cards = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("[mdboard.loader.scan] Skipping unreadable entry in {:?}: {}", folder, e);
                continue;
            }
        };

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_file || !is_card_file_name(&name) {
            continue;
        }

        let path = entry.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("[mdboard.loader.read] Skipping {:?}: {}", path, e);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        match card_from_text(&path, &name, &text, policy) {
            Some(card) => cards.push(card),
            None => log::info!("[mdboard.loader.title] Skipping {:?}: no usable title", path),
        }
    }

    sort_cards(&mut cards);
    Ok(cards)
}

/// Build a card from one file's text. Returns None when no title can be derived.
pub fn card_from_text(path: &Path, file_name: &str, text: &str, policy: TitlePolicy) -> Option<Card> {
    let document = frontmatter::parse(text);

    let title = match document.trimmed_field(FIELD_TITLE) {
        Some(title) => title.to_string(),
        None => match policy {
            TitlePolicy::Strict => return None,
            TitlePolicy::FileStem => {
                let stem = Path::new(file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().trim().to_string())
                    .unwrap_or_default();
                if stem.is_empty() {
                    return None;
                }
                stem
            }
        },
    };

    let summary = document.trimmed_field(FIELD_SUMMARY).map(str::to_string);
    let status = document
        .trimmed_field(FIELD_STATUS)
        .unwrap_or(DEFAULT_STATUS)
        .to_string();

    let id = path.to_string_lossy().to_string();
    let asset_path = path.parent().map(Path::to_path_buf).unwrap_or_default();

    Some(Card {
        id,
        title,
        summary,
        status,
        file_path: path.to_path_buf(),
        asset_path,
    })
}

/// Accent- and case-insensitive sort key approximating locale collation.
pub fn collation_key(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b)).then_with(|| a.cmp(b))
}

/// Sort by title; identical titles fall back to id so the order is stable
/// across directory listing orders.
pub fn sort_cards(cards: &mut [Card]) {
    cards.sort_by(|a, b| compare_titles(&a.title, &b.title).then_with(|| a.id.cmp(&b.id)));
}
