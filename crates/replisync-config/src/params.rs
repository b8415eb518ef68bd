//! Validation of the parameters a sync run is started with
//!
//! Everything here runs once, before the first run. Operator confirmation
//! (creating a missing replica, accepting deletions in a non-empty one) is the
//! caller's business and must already have happened.

use crate::{Config, ConfigError, ConfigResult};
use replisync_types::SyncInterval;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name used when the log path names a directory
pub const DEFAULT_LOG_FILE_NAME: &str = "log.txt";

/// Pre-validated sync parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncParams {
    /// Authoritative tree (canonical path)
    pub source: PathBuf,
    /// Mirrored tree (canonical path)
    pub replica: PathBuf,
    /// Resolved audit log file
    pub log_file: PathBuf,
    /// Delay between runs
    pub interval: SyncInterval,
}

impl SyncParams {
    /// Validate explicit parameters
    pub fn validate<S, R, L>(
        source: S,
        replica: R,
        log_file: L,
        interval: SyncInterval,
    ) -> ConfigResult<Self>
    where
        S: AsRef<Path>,
        R: AsRef<Path>,
        L: AsRef<Path>,
    {
        let source = validate_source(source.as_ref())?;
        let replica = validate_replica(replica.as_ref())?;

        if source == replica {
            return Err(ConfigError::invalid_path(
                &replica,
                "source and replica are the same directory",
            ));
        }
        if replica.starts_with(&source) {
            return Err(ConfigError::invalid_path(
                &replica,
                "replica folder lies inside the source folder",
            ));
        }
        if source.starts_with(&replica) {
            return Err(ConfigError::invalid_path(
                &source,
                "source folder lies inside the replica folder",
            ));
        }

        let log_file = validate_log_file(&resolve_log_path(log_file.as_ref()), &source, &replica)?;

        debug!(
            "Validated sync parameters: {} -> {} (log {}, every {})",
            source.display(),
            replica.display(),
            log_file.display(),
            interval
        );

        Ok(Self {
            source,
            replica,
            log_file,
            interval,
        })
    }

    /// Validate the parameters held in a merged configuration
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let source = config
            .sync
            .source
            .as_ref()
            .ok_or_else(|| ConfigError::missing_required("sync.source"))?;
        let replica = config
            .sync
            .replica
            .as_ref()
            .ok_or_else(|| ConfigError::missing_required("sync.replica"))?;
        let log_file = config
            .sync
            .log_file
            .as_ref()
            .ok_or_else(|| ConfigError::missing_required("sync.log_file"))?;

        Self::validate(source, replica, log_file, config.sync.interval_secs)
    }
}

/// Resolve the audit log location.
///
/// A path that is an existing directory, or that is neither an existing file
/// nor ends in `.txt`, is treated as a directory holding `log.txt`.
pub fn resolve_log_path(path: &Path) -> PathBuf {
    let is_txt = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

    if path.is_dir() || (!path.is_file() && !is_txt) {
        path.join(DEFAULT_LOG_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

/// Whether a directory has no entries at all
pub fn is_empty_dir(path: &Path) -> ConfigResult<bool> {
    let mut entries = std::fs::read_dir(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(entries.next().is_none())
}

fn canonical(path: &Path) -> ConfigResult<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Check that the source is a non-empty directory, returning its canonical path
pub fn validate_source(path: &Path) -> ConfigResult<PathBuf> {
    if !path.is_dir() {
        return Err(ConfigError::invalid_path(path, "does not exist or is not a directory"));
    }
    if is_empty_dir(path)? {
        return Err(ConfigError::invalid_path(path, "source folder is empty"));
    }
    canonical(path)
}

fn validate_replica(path: &Path) -> ConfigResult<PathBuf> {
    if !path.is_dir() {
        return Err(ConfigError::invalid_path(path, "does not exist or is not a directory"));
    }
    canonical(path)
}

fn validate_log_file(path: &Path, source: &Path, replica: &Path) -> ConfigResult<PathBuf> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ConfigError::invalid_path(
            path,
            "log file directory does not exist",
        ));
    }
    if path.is_dir() {
        return Err(ConfigError::invalid_path(path, "log file is a directory"));
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| ConfigError::invalid_path(path, "log file has no file name"))?;
    let log_file = canonical(parent)?.join(file_name);

    if log_file.starts_with(replica) {
        return Err(ConfigError::invalid_path(
            &log_file,
            "log file lies inside the replica folder and would be removed as stale",
        ));
    }
    if log_file.starts_with(source) {
        warn!(
            "Log file {} lies inside the source folder and will itself be mirrored",
            log_file.display()
        );
    }

    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Layout {
        _root: TempDir,
        source: PathBuf,
        replica: PathBuf,
        logs: PathBuf,
    }

    fn layout() -> Layout {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source");
        let replica = root.path().join("replica");
        let logs = root.path().join("logs");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&replica).unwrap();
        fs::create_dir_all(&logs).unwrap();
        fs::write(source.join("a.txt"), "hi").unwrap();
        Layout {
            _root: root,
            source,
            replica,
            logs,
        }
    }

    fn interval() -> SyncInterval {
        SyncInterval::from_secs(10).unwrap()
    }

    #[test]
    fn test_valid_parameters() {
        let l = layout();
        let params =
            SyncParams::validate(&l.source, &l.replica, l.logs.join("sync.txt"), interval())
                .unwrap();

        assert_eq!(params.source, fs::canonicalize(&l.source).unwrap());
        assert_eq!(params.replica, fs::canonicalize(&l.replica).unwrap());
        assert_eq!(
            params.log_file,
            fs::canonicalize(&l.logs).unwrap().join("sync.txt")
        );
        assert_eq!(params.interval.as_secs(), 10);
    }

    #[test]
    fn test_log_directory_gets_default_file_name() {
        let l = layout();
        let params = SyncParams::validate(&l.source, &l.replica, &l.logs, interval()).unwrap();
        assert!(params.log_file.ends_with("logs/log.txt"));
    }

    #[test]
    fn test_resolve_log_path_rules() {
        let l = layout();
        assert_eq!(
            resolve_log_path(&l.logs.join("run.txt")),
            l.logs.join("run.txt")
        );
        assert_eq!(resolve_log_path(&l.logs), l.logs.join("log.txt"));
        assert_eq!(
            resolve_log_path(&l.logs.join("journal")),
            l.logs.join("journal").join("log.txt")
        );

        let existing = l.logs.join("existing.log");
        fs::write(&existing, "").unwrap();
        assert_eq!(resolve_log_path(&existing), existing);
    }

    #[test]
    fn test_empty_source_rejected() {
        let l = layout();
        fs::remove_file(l.source.join("a.txt")).unwrap();

        let err = SyncParams::validate(&l.source, &l.replica, &l.logs, interval()).unwrap_err();
        assert!(err.to_string().contains("source folder is empty"));
    }

    #[test]
    fn test_missing_replica_rejected() {
        let l = layout();
        let err = SyncParams::validate(&l.source, l.replica.join("nope"), &l.logs, interval())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath { .. }));
    }

    #[test]
    fn test_nested_roots_rejected() {
        let l = layout();
        let nested = l.source.join("mirror");
        fs::create_dir_all(&nested).unwrap();

        assert!(SyncParams::validate(&l.source, &nested, &l.logs, interval()).is_err());
        assert!(SyncParams::validate(&l.source, &l.source, &l.logs, interval()).is_err());
    }

    #[test]
    fn test_log_inside_replica_rejected() {
        let l = layout();
        let err = SyncParams::validate(&l.source, &l.replica, &l.replica, interval()).unwrap_err();
        assert!(err.to_string().contains("inside the replica folder"));
    }

    #[test]
    fn test_from_config_requires_paths() {
        let config = Config::default();
        let err = SyncParams::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));
    }

    #[test]
    fn test_from_config() {
        let l = layout();
        let mut config = Config::default();
        config.sync.source = Some(l.source.clone());
        config.sync.replica = Some(l.replica.clone());
        config.sync.log_file = Some(l.logs.clone());

        let params = SyncParams::from_config(&config).unwrap();
        assert_eq!(params.interval.as_secs(), 60);
    }
}
