/// Process-wide logger.
///
/// env_logger decides what is enabled (RUST_LOG, or the level passed to
/// `init`); every enabled record is then kept in a ring buffer for `/logs`,
/// appended to `<config dir>/mdboard/logs/backend.log`, broadcast to
/// `/logs/stream` subscribers, and echoed to stderr.
use env_logger::{Logger, Target};
use log::{Level, Log, Metadata, Record, SetLoggerError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex};
use tokio::sync::broadcast;

const MAX_LOG_ENTRIES: usize = 2000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// Query for `/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    /// Most severe first: error, warn, info, debug, trace.
    pub level: Option<String>,
    pub limit: Option<usize>,
}

impl LogFilter {
    fn admits(&self, entry: &LogEntry) -> bool {
        let Some(max) = self.level.as_deref().and_then(|l| l.parse::<Level>().ok()) else {
            return true;
        };
        entry
            .level
            .parse::<Level>()
            .map(|level| level <= max)
            .unwrap_or(true)
    }
}

struct LogHub {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    tx: broadcast::Sender<LogEntry>,
}

impl LogHub {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(512);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            tx,
        }
    }

    fn push(&self, entry: LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry.clone());
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }
        let _ = self.tx.send(entry);
    }

    /// Matching entries, oldest first; `limit` keeps the newest.
    fn query(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut matched: Vec<LogEntry> = entries.iter().filter(|e| filter.admits(e)).cloned().collect();
        if let Some(limit) = filter.limit {
            let skip = matched.len().saturating_sub(limit);
            matched.drain(..skip);
        }
        matched
    }
}

static LOG_HUB: LazyLock<LogHub> = LazyLock::new(|| LogHub::new(MAX_LOG_ENTRIES));

struct LogFile {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl LogFile {
    fn new() -> Self {
        let path = crate::config::app_dir().join("logs").join("backend.log");
        let file = Self::open(&path).ok();
        Self {
            path,
            file: Mutex::new(file),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn append(&self, line: &str) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if guard.is_none() {
            match Self::open(&self.path) {
                Ok(file) => *guard = Some(file),
                Err(_) => return,
            }
        }
        if let Some(file) = guard.as_mut() {
            let _ = writeln!(file, "{}", line);
            let _ = file.flush();
        }
    }
}

static LOG_FILE: LazyLock<LogFile> = LazyLock::new(LogFile::new);

fn format_log_line(entry: &LogEntry) -> String {
    let when = chrono::DateTime::from_timestamp_millis(entry.timestamp_ms as i64)
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| entry.timestamp_ms.to_string());
    format!(
        "{} {:<5} [{}] {}",
        when,
        entry.level.to_uppercase(),
        entry.target,
        entry.message.replace('\n', "\\n")
    )
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn record(entry: LogEntry) {
    let line = format_log_line(&entry);
    eprintln!("{}", line);
    LOG_FILE.append(&line);
    LOG_HUB.push(entry);
}

struct BridgeLogger {
    inner: Logger,
}

impl Log for BridgeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record_: &Record<'_>) {
        if !self.enabled(record_.metadata()) {
            return;
        }
        record(LogEntry {
            timestamp_ms: now_ms(),
            level: record_.level().to_string().to_lowercase(),
            target: record_.target().to_string(),
            message: record_.args().to_string(),
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the logger. `level` is used when RUST_LOG is unset.
pub fn init(level: Option<&str>) -> Result<(), SetLoggerError> {
    let _ = &*LOG_FILE;
    let default_level = level.unwrap_or("info");
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    builder.target(Target::Pipe(Box::new(io::sink())));
    let logger = Box::leak(Box::new(BridgeLogger {
        inner: builder.build(),
    }));
    log::set_logger(logger)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

pub fn recent_entries(filter: &LogFilter) -> Vec<LogEntry> {
    LOG_HUB.query(filter)
}

pub fn subscribe() -> broadcast::Receiver<LogEntry> {
    LOG_HUB.tx.subscribe()
}

pub fn log_file_path() -> String {
    LOG_FILE.path.display().to_string()
}

/// Record a line even when the logger could not be installed.
pub fn write_fallback_line(message: &str) {
    record(LogEntry {
        timestamp_ms: now_ms(),
        level: "error".to_string(),
        target: "mdboard.log_bridge".to_string(),
        message: message.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: &str, message: &str) -> LogEntry {
        LogEntry {
            timestamp_ms: 0,
            level: level.to_string(),
            target: "test".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ring_buffer_keeps_newest() {
        let hub = LogHub::new(3);
        for i in 0..5 {
            hub.push(entry("info", &i.to_string()));
        }
        let messages: Vec<String> = hub
            .query(&LogFilter::default())
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_query_filters_level_and_limit() {
        let hub = LogHub::new(10);
        hub.push(entry("debug", "d"));
        hub.push(entry("warn", "w1"));
        hub.push(entry("error", "e"));
        hub.push(entry("warn", "w2"));

        let filter = LogFilter {
            level: Some("warn".to_string()),
            limit: Some(2),
        };
        let messages: Vec<String> = hub.query(&filter).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["e", "w2"]);
    }

    #[test]
    fn test_format_log_line_escapes_newlines() {
        let line = format_log_line(&entry("warn", "a\nb"));
        assert!(line.starts_with("1970-01-01T00:00:00.000Z WARN "));
        assert!(line.ends_with("[test] a\\nb"));
    }
}
