/// Configuration for the mdboard backend.
/// Reads config.json from ~/.config/mdboard/config.json (or platform equivalent).
use mdboard_core::types::TitlePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Folders opened at startup when none are given on the command line.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Column layout store (default: <config dir>/mdboard/layout.json).
    #[serde(default)]
    pub layout_store: Option<PathBuf>,
    /// Where deleted cards go (default: <config dir>/mdboard/trash).
    #[serde(default)]
    pub trash_dir: Option<PathBuf>,
    #[serde(default)]
    pub title_policy: TitlePolicy,
    /// Program used for editCard/createCard, e.g. "code --wait".
    /// Falls back to the system opener.
    #[serde(default)]
    pub editor_command: Option<String>,
}

fn default_port() -> u16 {
    7878
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            folders: Vec::new(),
            layout_store: None,
            trash_dir: None,
            title_policy: TitlePolicy::default(),
            editor_command: None,
        }
    }
}

impl BoardConfig {
    pub fn layout_store_path(&self) -> PathBuf {
        self.layout_store
            .clone()
            .unwrap_or_else(|| app_dir().join("layout.json"))
    }

    pub fn trash_path(&self) -> PathBuf {
        self.trash_dir.clone().unwrap_or_else(|| app_dir().join("trash"))
    }
}

/// ~/.config/mdboard
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdboard")
}

/// Default config path: ~/.config/mdboard/config.json
pub fn default_config_path() -> PathBuf {
    app_dir().join("config.json")
}

/// Load config from path. Returns default if the file is missing or unparsable.
pub fn load_config(path: &Path) -> BoardConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[mdboard.config] Failed to parse config {}: {}", path.display(), e);
            BoardConfig::default()
        }),
        Err(_) => {
            log::info!("[mdboard.config] No config at {}, using defaults", path.display());
            BoardConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config.port, 7878);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.title_policy, TitlePolicy::FileStem);
        assert!(config.folders.is_empty());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"port": 9000, "folders": ["/tmp/tasks"], "titlePolicy": "strict", "trashDir": "/tmp/trash", "editorCommand": "vim"}"#,
        )
        .unwrap();

        let config = load_config(&path);
        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.folders, vec!["/tmp/tasks".to_string()]);
        assert_eq!(config.title_policy, TitlePolicy::Strict);
        assert_eq!(config.trash_path(), PathBuf::from("/tmp/trash"));
        assert_eq!(config.editor_command.as_deref(), Some("vim"));
        assert!(config.layout_store_path().ends_with("mdboard/layout.json"));
    }

    #[test]
    fn test_corrupt_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ port: nope").unwrap();
        assert_eq!(load_config(&path).port, 7878);
    }
}
