//! Recursive directory scanning

use replisync_types::{EntryKind, Error, Result, SymlinkPolicy};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Every entry found under one root, keyed by path relative to that root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    /// Root the relative paths hang off
    pub root: PathBuf,
    /// Entries in lexicographic path order
    pub entries: BTreeMap<PathBuf, EntryKind>,
    /// Paths that exist but could not be read
    pub skipped: BTreeSet<PathBuf>,
}

impl TreeSnapshot {
    /// Empty snapshot for `root`
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
            skipped: BTreeSet::new(),
        }
    }

    /// Kind of the entry at `path`, if any
    pub fn get(&self, path: &Path) -> Option<EntryKind> {
        self.entries.get(path).copied()
    }

    /// Relative paths of regular files
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|(_, kind)| kind.is_file())
            .map(|(path, _)| path.as_path())
    }

    /// Number of regular files
    pub fn file_count(&self) -> usize {
        self.files().count()
    }

    /// Absolute path for a relative entry path
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// Walks a directory tree and records every entry beneath it
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeScanner {
    follow_links: bool,
}

impl TreeScanner {
    /// Scanner for the source tree, following links only when asked to
    pub fn source(policy: SymlinkPolicy) -> Self {
        Self {
            follow_links: policy == SymlinkPolicy::Follow,
        }
    }

    /// Scanner for the replica tree, which never follows links
    pub fn replica() -> Self {
        Self {
            follow_links: false,
        }
    }

    /// Scan `root` recursively.
    ///
    /// Entries below the root that cannot be read are logged and recorded in
    /// [`TreeSnapshot::skipped`]; an unreadable root fails the scan.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<TreeSnapshot> {
        let root = root.as_ref();
        let metadata = std::fs::metadata(root).map_err(|e| Error::io_at(root, e))?;
        if !metadata.is_dir() {
            return Err(Error::sync(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        let mut snapshot = TreeSnapshot::new(root);
        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(self.follow_links)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    match e.path().and_then(|p| p.strip_prefix(root).ok()) {
                        Some(relative) if !relative.as_os_str().is_empty() => {
                            warn!("Skipping unreadable entry {}: {}", relative.display(), e);
                            snapshot.skipped.insert(relative.to_path_buf());
                        }
                        _ => {
                            return Err(Error::sync(format!(
                                "failed to read '{}': {}",
                                root.display(),
                                e
                            )));
                        }
                    }
                    continue;
                }
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| {
                    Error::sync(format!(
                        "'{}' escaped scan root '{}'",
                        entry.path().display(),
                        root.display()
                    ))
                })?
                .to_path_buf();

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_symlink() {
                EntryKind::Symlink
            } else {
                EntryKind::Other
            };

            snapshot.entries.insert(relative, kind);
        }

        debug!(
            "Scanned {} entries ({} files) under '{}'",
            snapshot.entries.len(),
            snapshot.file_count(),
            root.display()
        );
        Ok(snapshot)
    }

    /// Scan on the blocking pool so the runtime thread is not held up
    pub async fn scan_blocking(self, root: PathBuf) -> Result<TreeSnapshot> {
        tokio::task::spawn_blocking(move || self.scan(root))
            .await
            .map_err(|e| Error::other(format!("scan task failed: {}", e)))?
    }
}
