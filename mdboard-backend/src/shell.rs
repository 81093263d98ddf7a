/// Headless desktop integration for the backend.
///
/// `ClientBoard` sends the title inside `createCard` and asks for delete
/// confirmation itself (`request_delete` / `confirm_delete`), so neither
/// needs a prompt here. Files open through the configured editor or the
/// system opener.
use mdboard_core::host::{HostShell, ShellError};
use std::path::Path;
use std::process::Command;

pub struct DesktopShell {
    editor_command: Option<String>,
}

impl DesktopShell {
    pub fn new(editor_command: Option<String>) -> Self {
        let editor_command = editor_command.filter(|c| !c.trim().is_empty());
        Self { editor_command }
    }

    fn launch_editor(&self, command: &str, path: &Path) -> Result<(), ShellError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| ShellError::Launch {
            command: command.to_string(),
            reason: "empty command".to_string(),
        })?;

        Command::new(program)
            .args(parts)
            .arg(path)
            .spawn()
            .map_err(|e| ShellError::Launch {
                command: command.to_string(),
                reason: e.to_string(),
            })?;
        log::info!("[mdboard.shell.editor] {} {}", command, path.display());
        Ok(())
    }

    fn launch_system(&self, path: &Path) -> Result<(), ShellError> {
        open::that_detached(path).map_err(|e| ShellError::Launch {
            command: "system opener".to_string(),
            reason: e.to_string(),
        })?;
        log::info!("[mdboard.shell.open] {}", path.display());
        Ok(())
    }
}

impl HostShell for DesktopShell {
    fn prompt_title(&self, _status: &str) -> Result<Option<String>, ShellError> {
        Err(ShellError::Unsupported("title prompt"))
    }

    fn confirm_delete(&self, title: &str, path: &Path) -> Result<bool, ShellError> {
        log::debug!("[mdboard.shell.confirm] Deleting '{}' ({})", title, path.display());
        Ok(true)
    }

    fn open_preview(&self, path: &Path) -> Result<(), ShellError> {
        self.launch_system(path)
    }

    fn open_editor(&self, path: &Path) -> Result<(), ShellError> {
        match &self.editor_command {
            Some(command) => self.launch_editor(command, path),
            None => self.launch_system(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_prompt_unsupported() {
        let shell = DesktopShell::new(None);
        assert!(matches!(
            shell.prompt_title("Inbox 📥"),
            Err(ShellError::Unsupported(_))
        ));
    }

    #[test]
    fn test_blank_editor_command_ignored() {
        let shell = DesktopShell::new(Some("   ".to_string()));
        assert!(shell.editor_command.is_none());
    }

    #[test]
    fn test_missing_editor_reports_launch_error() {
        let shell = DesktopShell::new(Some("mdboard-no-such-editor --wait".to_string()));
        let err = shell
            .open_editor(Path::new("/tmp/card.md"))
            .unwrap_err();
        match err {
            ShellError::Launch { command, .. } => {
                assert_eq!(command, "mdboard-no-such-editor --wait")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
