//! Application of sync actions to the replica tree

use crate::logger::{SyncEvent, SyncLogger};
use replisync_types::{EntryKind, Error, Result, RunSummary, SyncAction};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Suffix of the temporary sibling a staged copy is written to
pub const PARTIAL_SUFFIX: &str = "replisync-partial";

/// How copies are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Write to a temporary sibling and rename over the target
    pub staged_copy: bool,
    /// Carry permission bits over to the replica file
    pub preserve_permissions: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            staged_copy: true,
            preserve_permissions: true,
        }
    }
}

/// Applies a diff to the replica, one action at a time
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    source_root: PathBuf,
    replica_root: PathBuf,
    options: ExecutorOptions,
}

impl SyncExecutor {
    /// Create an executor for the given roots
    pub fn new<S, R>(source_root: S, replica_root: R, options: ExecutorOptions) -> Self
    where
        S: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            options,
        }
    }

    /// Apply `actions` in order and tally the outcome.
    ///
    /// A failed action is logged and counted in [`RunSummary::failed`]; the
    /// remaining actions still run. Cancellation is checked before each
    /// action, so an action already started always completes.
    pub async fn apply(
        &self,
        actions: &[SyncAction],
        logger: &mut SyncLogger,
        token: &CancellationToken,
    ) -> RunSummary {
        let mut summary = RunSummary::new();

        for action in actions {
            if token.is_cancelled() {
                summary.interrupted = true;
                Self::emit(logger, SyncEvent::Interrupted).await;
                break;
            }

            let event = match action {
                SyncAction::Delete { path, kind } => self.delete(path, *kind, &mut summary).await,
                SyncAction::Copy { path } => self.copy(path, &mut summary).await,
                SyncAction::Skip { path } => {
                    summary.identical += 1;
                    SyncEvent::Identical {
                        path: self.source_root.join(path),
                    }
                }
            };
            Self::emit(logger, event).await;
        }

        debug!(
            "Applied {} of {} actions ({} failed)",
            summary.total_processed(),
            actions.len(),
            summary.failed
        );
        summary
    }

    async fn delete(&self, path: &Path, kind: EntryKind, summary: &mut RunSummary) -> SyncEvent {
        let target = self.replica_root.join(path);
        let result = if kind.is_dir() {
            fs::remove_dir(&target).await
        } else {
            fs::remove_file(&target).await
        };

        match result {
            Ok(()) => {
                if kind.is_dir() {
                    summary.directories_removed += 1;
                } else {
                    summary.removed += 1;
                }
                SyncEvent::Removed { path: target }
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Failed to remove {} {}: {}", kind, target.display(), e);
                SyncEvent::RemoveFailed {
                    path: target,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn copy(&self, path: &Path, summary: &mut RunSummary) -> SyncEvent {
        let source = self.source_root.join(path);
        let target = self.replica_root.join(path);

        match self.copy_file(&source, &target).await {
            Ok(bytes) => {
                summary.copied += 1;
                debug!(
                    "Copied {} -> {} ({} bytes)",
                    source.display(),
                    target.display(),
                    bytes
                );
                SyncEvent::Copied { path: source }
            }
            Err(e) => {
                summary.failed += 1;
                warn!("Failed to copy {}: {}", source.display(), e);
                SyncEvent::CopyFailed {
                    path: source,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn copy_file(&self, source: &Path, target: &Path) -> Result<u64> {
        let parent = target
            .parent()
            .ok_or_else(|| Error::sync(format!("'{}' has no parent", target.display())))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io_at(parent, e))?;

        if !self.options.staged_copy {
            // A replica file carrying read-only source permissions cannot be reopened for writing
            remove_existing(target).await?;
            return self.write_copy(source, target).await;
        }

        let partial = partial_path(target)?;
        match self.write_copy(source, &partial).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&partial, target).await {
                    discard_partial(&partial).await;
                    return Err(Error::io_at(target, e));
                }
                Ok(bytes)
            }
            Err(e) => {
                discard_partial(&partial).await;
                Err(e)
            }
        }
    }

    /// Write the content of `source` to `destination` and carry over its
    /// access and modification times.
    async fn write_copy(&self, source: &Path, destination: &Path) -> Result<u64> {
        let mut reader = fs::File::open(source)
            .await
            .map_err(|e| Error::io_at(source, e))?;
        let metadata = reader
            .metadata()
            .await
            .map_err(|e| Error::io_at(source, e))?;

        let mut writer = fs::File::create(destination)
            .await
            .map_err(|e| Error::io_at(destination, e))?;
        let bytes = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| Error::io_at(destination, e))?;
        writer
            .sync_all()
            .await
            .map_err(|e| Error::io_at(destination, e))?;
        drop(writer);

        let atime = filetime::FileTime::from_last_access_time(&metadata);
        let mtime = filetime::FileTime::from_last_modification_time(&metadata);
        filetime::set_file_times(destination, atime, mtime)
            .map_err(|e| Error::io_at(destination, e))?;

        if self.options.preserve_permissions {
            if let Err(e) = fs::set_permissions(destination, metadata.permissions()).await {
                warn!(
                    "Could not carry permissions over to {}: {}",
                    destination.display(),
                    e
                );
            }
        }

        Ok(bytes)
    }

    async fn emit(logger: &mut SyncLogger, event: SyncEvent) {
        if let Err(e) = logger.record(&event).await {
            warn!("Could not write to {}: {}", logger.log_file().display(), e);
        }
    }
}

/// Temporary sibling `.<name>.replisync-partial` of `target`
pub fn partial_path(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| Error::sync(format!("'{}' has no file name", target.display())))?;
    let mut partial = OsString::from(".");
    partial.push(name);
    partial.push(".");
    partial.push(PARTIAL_SUFFIX);
    Ok(target.with_file_name(partial))
}

async fn remove_existing(target: &Path) -> Result<()> {
    match fs::remove_file(target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io_at(target, e)),
    }
}

async fn discard_partial(partial: &Path) {
    if let Err(e) = fs::remove_file(partial).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", partial.display(), e);
        }
    }
}
