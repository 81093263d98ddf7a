/// File naming helpers for new cards and trashed files.
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Highest numbered suffix tried before falling back to a timestamp.
pub const MAX_NUMBERED_SUFFIX: u32 = 9999;

const FALLBACK_SLUG: &str = "untitled";

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// Lowercase, collapse every run of non-alphanumeric characters into a single
/// hyphen, and trim hyphens from both ends. Empty results become `untitled`.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = NON_ALNUM_RE.replace_all(&lowered, "-");
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// First free `{stem}.{ext}`, `{stem}-2.{ext}`, … `{stem}-9999.{ext}` in `dir`,
/// then `{stem}-{millis}.{ext}`.
pub fn unique_file_name(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    unique_file_name_with(dir, stem, ext, |path| path.exists())
}

/// Same as [`unique_file_name`] with an injectable existence check.
pub fn unique_file_name_with(
    dir: &Path,
    stem: &str,
    ext: &str,
    exists: impl Fn(&Path) -> bool,
) -> PathBuf {
    for index in 1..=MAX_NUMBERED_SUFFIX {
        let name = if index == 1 {
            format!("{}.{}", stem, ext)
        } else {
            format!("{}-{}.{}", stem, index, ext)
        };
        let candidate = dir.join(name);
        if !exists(&candidate) {
            return candidate;
        }
    }

    let ts = chrono::Utc::now().timestamp_millis();
    dir.join(format!("{}-{}.{}", stem, ts, ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Task"), "my-task");
        assert_eq!(slugify("  Fix: the *bug*!  "), "fix-the-bug");
        assert_eq!(slugify("Release v2.0"), "release-v2-0");
        assert_eq!(slugify("---"), "untitled");
        assert_eq!(slugify("📥"), "untitled");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
    }

    #[test]
    fn test_unique_file_name_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_file_name(dir.path(), "my-task", "md");
        assert_eq!(first, dir.path().join("my-task.md"));
        std::fs::write(&first, "x").unwrap();

        let second = unique_file_name(dir.path(), "my-task", "md");
        assert_eq!(second, dir.path().join("my-task-2.md"));
        std::fs::write(&second, "x").unwrap();

        let third = unique_file_name(dir.path(), "my-task", "md");
        assert_eq!(third, dir.path().join("my-task-3.md"));
    }

    #[test]
    fn test_unique_file_name_timestamp_fallback() {
        let dir = Path::new("/virtual");
        let name = unique_file_name_with(dir, "busy", "md", |_| true);
        let file_name = name.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("busy-"));
        assert!(file_name.ends_with(".md"));
        let digits = &file_name["busy-".len()..file_name.len() - ".md".len()];
        assert!(digits.parse::<i64>().unwrap() > i64::from(MAX_NUMBERED_SUFFIX));
    }
}
