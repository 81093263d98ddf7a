/// Folder selection for the command line: accept a supplied directory or ask
/// on stdin until the user names one.
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PickerError {
    #[error("No folder selected")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Returns `candidate` if it is a directory, otherwise prompts on `input`.
/// End of input cancels.
pub fn pick_folder<R: BufRead, W: Write>(
    candidate: Option<&Path>,
    input: &mut R,
    output: &mut W,
) -> Result<PathBuf, PickerError> {
    if let Some(path) = candidate {
        let path = expand_home(path);
        if path.is_dir() {
            return Ok(path);
        }
        writeln!(output, "Not a folder: {}", path.display())?;
    }

    loop {
        write!(output, "Folder to open: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(PickerError::Cancelled);
        }
        let answer = line.trim();
        if answer.is_empty() {
            continue;
        }

        let path = expand_home(Path::new(answer));
        if path.is_dir() {
            return Ok(path);
        }
        writeln!(output, "Not a folder: {}", path.display())?;
    }
}

/// Ask on the process's stdin/stdout.
pub fn pick_folder_interactive(candidate: Option<&Path>) -> Result<PathBuf, PickerError> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    pick_folder(candidate, &mut input, &mut output)
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
