use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use colored::Colorize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::ext::{BestEffortPathExt, SystemTimeExt};

/// Sink for human-readable sync events.
///
/// The reconciler only ever asks to record a message; where it ends up is the
/// implementor's business.
pub trait Journal {
    fn record(&mut self, message: &str);
}

/// Formats a journal line as `<YYYY-MM-DD HH:MM:SS> - <message>`.
pub fn format_line(timestamp: SystemTime, message: &str) -> String {
    format!("{} - {}", timestamp.to_log_timestamp(), message)
}

/// Appends journal lines to a file and optionally echoes them to stdout.
pub struct LogFile {
    file: File,
    path: PathBuf,
    echo: bool,
    color: bool,
}

impl LogFile {
    pub fn open(path: &Path, echo: bool) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context(OpenSnafu {
                path: path.to_path_buf(),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context(OpenSnafu {
                path: path.to_path_buf(),
            })?;
        debug!("Appending journal to {}", path.best_effort_path_display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            echo,
            color: supports_color::on(supports_color::Stream::Stdout).is_some(),
        })
    }
}

impl Journal for LogFile {
    fn record(&mut self, message: &str) {
        let now = SystemTime::now();
        let line = format_line(now, message);

        if let Err(err) = writeln!(self.file, "{line}") {
            warn!(
                "Failed to append to journal {}: {}",
                self.path.best_effort_path_display(),
                err
            );
        }

        if self.echo {
            if self.color {
                println!("{} - {}", now.to_log_timestamp().dimmed(), message);
            } else {
                println!("{line}");
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum JournalError {
    #[snafu(display("Failed to open the log file {}", path.best_effort_path_display()))]
    OpenError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Keeps recorded messages in memory, without timestamps.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryJournal {
    pub messages: Vec<String>,
}

#[cfg(test)]
impl MemoryJournal {
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|message| message.contains(needle))
    }
}

#[cfg(test)]
impl Journal for MemoryJournal {
    fn record(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn format_line_separates_timestamp_and_message() {
        let timestamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let line = format_line(timestamp, "Copying file 'a.txt'.");

        let (stamp, message) = line.split_once(" - ").unwrap();
        assert_eq!(stamp, timestamp.to_log_timestamp());
        assert_eq!(message, "Copying file 'a.txt'.");
    }

    #[test]
    fn log_file_appends_across_reopens() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("logs/folder_sync.log");

        let mut journal = LogFile::open(&path, false).unwrap();
        journal.record("first");
        drop(journal);
        let mut journal = LogFile::open(&path, false).unwrap();
        journal.record("second");
        drop(journal);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));
    }

    #[test]
    fn log_file_open_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = LogFile::open(&blocker.join("sync.log"), false);

        assert!(matches!(result, Err(JournalError::OpenError { .. })));
    }
}
