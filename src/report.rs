use chrono::prelude::*;
use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where the pipeline records per-item outcomes and stage summaries.
///
/// The sink is always passed explicitly to the stage functions, never held
/// as ambient state, so the pipeline stays testable without any logging
/// side effects. The pipeline does not care when or whether messages are
/// flushed or displayed.
pub trait MessageSink {
    fn info(&mut self, message: &str);
    fn error(&mut self, message: &str);
}

/// Sink that forwards to the `log` facade; the binary initializes
/// `env_logger` so these end up on stderr.
pub struct LogSink;

impl MessageSink for LogSink {
    fn info(&mut self, message: &str) {
        log::info!("{}", message);
    }

    fn error(&mut self, message: &str) {
        log::error!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Error,
}

impl MessageLevel {
    fn name(self) -> &'static str {
        match self {
            MessageLevel::Info => "INFO",
            MessageLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub level: MessageLevel,
    pub message: String,
}

/// Sink that buffers timestamped messages for the whole run and can write
/// them out as a `LOG_<start time>.txt` file afterwards. A display layer
/// can show the buffered entries; tests use it to assert on reported
/// outcomes.
#[derive(Debug, Clone)]
pub struct SessionLog {
    started: DateTime<Local>,
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> SessionLog {
        SessionLog {
            started: Local::now(),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.level == MessageLevel::Error)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Writes all buffered messages to `folder/LOG_<start time>.txt`,
    /// one line per message. Level names are padded so the timestamps
    /// line up. Returns the path of the written file.
    pub fn write_to_file(&self, folder: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(folder)?;
        let name = self.started.format("LOG_%Y_%m_%d_%H_%M_%S.txt").to_string();
        let path = folder.join(name);
        let file = File::create(&path)?;
        let mut buf = BufWriter::new(file);
        for entry in &self.entries {
            writeln!(
                buf,
                "[{:<5}] [{}] {}",
                entry.level.name(),
                entry.at.format("%Y-%m-%d %H:%M:%S"),
                entry.message
            )?;
        }
        Ok(path)
    }

    fn push(&mut self, level: MessageLevel, message: &str) {
        self.entries.push(LogEntry {
            at: Local::now(),
            level,
            message: message.to_string(),
        });
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        SessionLog::new()
    }
}

impl MessageSink for SessionLog {
    fn info(&mut self, message: &str) {
        self.push(MessageLevel::Info, message);
    }

    fn error(&mut self, message: &str) {
        self.push(MessageLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_log_buffers_in_order() {
        let mut log = SessionLog::new();
        log.info("first");
        log.error("second");
        log.info("third");
        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(log.error_count(), 1);
    }

    #[test]
    fn test_session_log_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::new();
        log.info("loaded 3 rows");
        log.error("bad file");
        let path = log.write_to_file(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("LOG_"));
        assert!(name.ends_with(".txt"));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[INFO ]"));
        assert!(lines[0].ends_with("loaded 3 rows"));
        assert!(lines[1].starts_with("[ERROR]"));
    }
}
