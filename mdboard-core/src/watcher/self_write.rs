/// Self-write suppression.
///
/// The board store registers a fingerprint of every file it writes. When the
/// watcher later reports that path, the host reads the file and asks the
/// tracker: a matching fingerprint means the event is our own echo and is
/// consumed; anything else is an external edit. Entries expire after 10s so a
/// write whose event never arrives does not linger.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::types::ContentFingerprint;

const FINGERPRINT_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
pub struct SelfWriteTracker {
    pending: HashMap<PathBuf, Vec<(ContentFingerprint, Instant)>>,
}

impl SelfWriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record content we are about to write to `path`.
    pub fn register(&mut self, path: &Path, content: &str) {
        self.register_at(path, content, Instant::now());
    }

    fn register_at(&mut self, path: &Path, content: &str, now: Instant) {
        self.expire(now);
        self.pending
            .entry(path.to_path_buf())
            .or_default()
            .push((ContentFingerprint::from_content(content), now));
    }

    /// True (and consumed) if `current_content` is one of our pending writes.
    pub fn check_and_consume(&mut self, path: &Path, current_content: &str) -> bool {
        self.check_and_consume_at(path, current_content, Instant::now())
    }

    fn check_and_consume_at(&mut self, path: &Path, current_content: &str, now: Instant) -> bool {
        self.expire(now);
        let fingerprint = ContentFingerprint::from_content(current_content);

        let Some(entries) = self.pending.get_mut(path) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|(fp, _)| *fp == fingerprint) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.pending.remove(path);
        }
        true
    }

    /// Drop everything pending for `path` (e.g. the file was trashed).
    pub fn forget(&mut self, path: &Path) {
        self.pending.remove(path);
    }

    pub fn has_pending(&self, path: &Path) -> bool {
        self.pending.get(path).map_or(false, |e| !e.is_empty())
    }

    fn expire(&mut self, now: Instant) {
        self.pending.retain(|_, entries| {
            entries.retain(|(_, at)| now.duration_since(*at) < FINGERPRINT_TTL);
            !entries.is_empty()
        });
    }
}
