//! Append-only audit log of replica mutations
//!
//! Every action lands in the log file as `YYYY-MM-DD HH:MM:SS - <message>`
//! and the bare message is mirrored to a console stream. The file is opened
//! in append mode for each write and is never truncated or rotated.

use replisync_types::{Error, Result, RunSummary};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Timestamp layout used at the start of every event line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Something that happened to the replica during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A replica entry was removed
    Removed {
        /// Absolute replica path
        path: PathBuf,
    },
    /// A replica file already matched its source
    Identical {
        /// Absolute source path
        path: PathBuf,
    },
    /// A source file was copied into the replica
    Copied {
        /// Absolute source path
        path: PathBuf,
    },
    /// Removing a replica entry failed
    RemoveFailed {
        /// Absolute replica path
        path: PathBuf,
        /// Failure description
        error: String,
    },
    /// Copying a source file failed
    CopyFailed {
        /// Absolute source path
        path: PathBuf,
        /// Failure description
        error: String,
    },
    /// The run stopped early because it was cancelled
    Interrupted,
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed { path } => {
                write!(f, "{} removed from replica folder", path.display())
            }
            Self::Identical { path } => write!(
                f,
                "{} already exists in replica folder and is identical",
                path.display()
            ),
            Self::Copied { path } => write!(f, "{} copied to replica folder", path.display()),
            Self::RemoveFailed { path, error } => write!(
                f,
                "{} could not be removed from replica folder: {}",
                path.display(),
                error
            ),
            Self::CopyFailed { path, error } => write!(
                f,
                "{} could not be copied to replica folder: {}",
                path.display(),
                error
            ),
            Self::Interrupted => write!(f, "Sync interrupted"),
        }
    }
}

/// The three per-run summary lines
pub fn summary_lines(summary: &RunSummary) -> [String; 3] {
    [
        format!("Files copied - {}", summary.copied),
        format!("Files removed - {}", summary.removed),
        format!("Files unaltered - {}", summary.identical),
    ]
}

/// Writes audit lines to the log file and mirrors them to a console stream
pub struct SyncLogger {
    log_file: PathBuf,
    mirror: Option<Box<dyn Write + Send>>,
}

impl fmt::Debug for SyncLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncLogger")
            .field("log_file", &self.log_file)
            .field("mirror", &self.mirror.is_some())
            .finish()
    }
}

impl SyncLogger {
    /// Logger appending to `log_file` and mirroring to stdout
    pub fn new<P: Into<PathBuf>>(log_file: P) -> Self {
        Self {
            log_file: log_file.into(),
            mirror: Some(Box::new(std::io::stdout())),
        }
    }

    /// Mirror to a different stream
    pub fn with_mirror(mut self, mirror: Box<dyn Write + Send>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Write to the log file only
    pub fn without_mirror(mut self) -> Self {
        self.mirror = None;
        self
    }

    /// Path of the audit log
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Append one timestamped event line
    pub async fn record(&mut self, event: &SyncEvent) -> Result<()> {
        let message = event.to_string();
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        let appended = self.append(&[format!("{} - {}", timestamp, message)]).await;
        self.mirror_lines(&[message]);
        appended
    }

    /// Append the per-run summary.
    ///
    /// Summary lines carry no timestamp; the event lines just before them do.
    pub async fn record_summary(&mut self, summary: &RunSummary) -> Result<()> {
        let lines = summary_lines(summary);
        let appended = self.append(&lines).await;
        self.mirror_lines(&lines);
        appended
    }

    async fn append(&self, lines: &[String]) -> Result<()> {
        let mut buffer = String::new();
        for line in lines {
            buffer.push_str(line);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .await
            .map_err(|e| Error::io_at(&self.log_file, e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| Error::io_at(&self.log_file, e))?;
        file.flush()
            .await
            .map_err(|e| Error::io_at(&self.log_file, e))?;
        Ok(())
    }

    fn mirror_lines(&mut self, lines: &[String]) {
        let Some(mirror) = self.mirror.as_mut() else {
            return;
        };
        for line in lines {
            if let Err(e) = writeln!(mirror, "{}", line) {
                warn!("Console mirror write failed: {}", e);
                return;
            }
        }
        let _ = mirror.flush();
    }
}
