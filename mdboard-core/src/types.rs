use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reserved column for cards without an explicit status.
/// Always present, always first, never deletable.
pub const DEFAULT_STATUS: &str = "Inbox 📥";

/// Markdown extension recognized as a card source (compared case-insensitively).
pub const CARD_EXTENSION: &str = "md";

/// One markdown file rendered as a card.
///
/// `id` is the absolute file path, so renaming or moving a file changes the
/// card's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub status: String,
    pub file_path: PathBuf,
    pub asset_path: PathBuf,
}

impl Card {
    pub fn to_webview(&self) -> WebviewCard {
        WebviewCard {
            id: self.id.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            status: self.status.clone(),
            file_path: self.file_path.to_string_lossy().to_string(),
            asset_path: self.asset_path.to_string_lossy().to_string(),
        }
    }
}

/// Client-visible card shape. Never carries the file body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebviewCard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: String,
    pub file_path: String,
    pub asset_path: String,
}

/// Full board snapshot sent to the client. The client never receives diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardPayload {
    pub folder_path: String,
    pub folder_name: String,
    pub columns: Vec<String>,
    pub cards: Vec<WebviewCard>,
}

impl BoardPayload {
    pub fn new(folder: &Path, columns: Vec<String>, cards: &[Card]) -> Self {
        Self {
            folder_path: folder.to_string_lossy().to_string(),
            folder_name: folder_display_name(folder),
            columns,
            cards: cards.iter().map(Card::to_webview).collect(),
        }
    }

    pub fn card(&self, id: &str) -> Option<&WebviewCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Number of cards currently claiming `status`.
    pub fn count_in(&self, status: &str) -> usize {
        self.cards.iter().filter(|card| card.status == status).count()
    }
}

/// How a card's title is derived when frontmatter has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TitlePolicy {
    /// Fall back to the file name stem; skip the file only if the stem is blank.
    #[default]
    FileStem,
    /// Skip every file whose frontmatter has no usable title.
    Strict,
}

/// Last path component, or the full path when there is none (e.g. `/`).
pub fn folder_display_name(folder: &Path) -> String {
    folder
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| folder.to_string_lossy().to_string())
}

/// Whether a file name looks like a card source.
pub fn is_card_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(CARD_EXTENSION))
}
