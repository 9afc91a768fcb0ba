use anyhow::Result;
use chrono::Local;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// Global log buffer, set once by `init_tracing`
static LOG_BUFFER: OnceLock<LogRingBuffer> = OnceLock::new();

/// A log entry with timestamp and message
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: Level, target: &str, message: String) -> Self {
        Self {
            timestamp: Local::now().format("%H:%M:%S.%3f").to_string(),
            level: level.to_string().to_uppercase(),
            target: target.to_string(),
            message,
        }
    }

    /// Format for display in the log overlay and the log file
    pub fn format_for_display(&self) -> String {
        format!(
            "[{}] {} [{}] {}",
            self.timestamp, self.level, self.target, self.message
        )
    }

    /// Parse one line of the compact fmt layer: `LEVEL target: message`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let levels = [
            ("TRACE ", Level::TRACE),
            ("DEBUG ", Level::DEBUG),
            ("INFO ", Level::INFO),
            ("WARN ", Level::WARN),
            ("ERROR ", Level::ERROR),
        ];
        let Some((level, rest)) = levels
            .iter()
            .find_map(|(prefix, level)| line.strip_prefix(prefix).map(|rest| (*level, rest.trim())))
        else {
            return Some(Self::new(Level::INFO, "general", line.to_string()));
        };

        // A target never contains spaces
        let (target, message) = match rest.split_once(':') {
            Some((target, message)) if !target.contains(' ') => (target, message.trim()),
            _ => ("general", rest),
        };
        Some(Self::new(level, target, message.to_string()))
    }
}

/// Thread-safe ring buffer for log entries
#[derive(Clone, Default)]
pub struct LogRingBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogRingBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        entries.iter().rev().take(count).rev().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Writer that feeds both the ring buffer and the log file
#[derive(Clone)]
pub struct DualWriter {
    buffer: LogRingBuffer,
    file: Arc<Mutex<Option<File>>>,
}

impl DualWriter {
    pub fn new(buffer: LogRingBuffer, file: Option<File>) -> Self {
        Self {
            buffer,
            file: Arc::new(Mutex::new(file)),
        }
    }
}

impl std::io::Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = std::str::from_utf8(buf) {
            for line in text.lines() {
                if let Some(entry) = LogEntry::parse(line) {
                    let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(file) = file.as_mut() {
                        let _ = writeln!(file, "{}", entry.format_for_display());
                        let _ = file.flush();
                    }
                    self.buffer.push(entry);
                }
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DualWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Handle returned by `init_tracing`
pub struct LoggingHandle {
    pub buffer: LogRingBuffer,
    pub log_path: Option<PathBuf>,
}

/// Open a timestamped log file in `log_dir` and point `latest.log` at it
fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("nlsql-cli_{}.log", timestamp));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    #[cfg(unix)]
    {
        let latest = log_dir.join("latest.log");
        let _ = std::fs::remove_file(&latest);
        let _ = std::os::unix::fs::symlink(&log_path, &latest);
    }

    Ok((file, log_path))
}

/// Initialize tracing into the ring buffer and, when possible, a log file.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(log_dir: Option<&Path>) -> LoggingHandle {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let buffer = LOG_BUFFER.get_or_init(LogRingBuffer::new).clone();

    let (file, log_path) = match log_dir.map(open_log_file) {
        Some(Ok((file, path))) => (Some(file), Some(path)),
        Some(Err(e)) => {
            buffer.push(LogEntry::new(
                Level::WARN,
                "system",
                format!("Could not open log file: {}", e),
            ));
            (None, None)
        }
        None => (None, None),
    };

    let writer = DualWriter::new(buffer.clone(), file);
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .without_time()
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second initialization (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();

    tracing::info!(target: "system", "Logging initialized");

    LoggingHandle { buffer, log_path }
}

/// Get the global log buffer
pub fn get_log_buffer() -> Option<LogRingBuffer> {
    LOG_BUFFER.get().cloned()
}
