//! Tree difference detection
//!
//! Compares a source snapshot against a replica snapshot and decides, per
//! relative path, whether the replica entry must be deleted, the source file
//! copied, or nothing done.

use crate::hasher::ContentHasher;
use crate::scanner::TreeSnapshot;
use replisync_types::{EntryKind, SyncAction};
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Engine for detecting differences between a source and a replica tree
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeDiffEngine {
    hasher: ContentHasher,
}

impl TreeDiffEngine {
    /// Create a diff engine comparing file contents with `hasher`
    pub fn new(hasher: ContentHasher) -> Self {
        Self { hasher }
    }

    /// Produce the actions that make `replica` match `source`.
    ///
    /// Deletions come first, deepest path first, so a directory is only
    /// reached once everything below it has been handled. Copies and skips
    /// follow in lexicographic order.
    pub async fn diff(&self, source: &TreeSnapshot, replica: &TreeSnapshot) -> Vec<SyncAction> {
        let mut actions = Self::deletions(source, replica);
        let deletes = actions.len();

        for path in source.files() {
            let action = match replica.get(path) {
                Some(EntryKind::File) => self.compare(source, replica, path).await,
                _ => SyncAction::Copy {
                    path: path.to_path_buf(),
                },
            };
            actions.push(action);
        }

        debug!(
            "Diff produced {} deletions and {} copy/skip decisions",
            deletes,
            actions.len() - deletes
        );
        actions
    }

    /// Stale replica entries, ordered children before parents
    pub fn deletions(source: &TreeSnapshot, replica: &TreeSnapshot) -> Vec<SyncAction> {
        let mut stale: Vec<(&PathBuf, EntryKind)> = replica
            .entries
            .iter()
            .filter(|(path, kind)| Self::is_stale(source, path, **kind))
            .map(|(path, kind)| (path, *kind))
            .collect();

        stale.sort_by(|(a, _), (b, _)| {
            Reverse(a.components().count())
                .cmp(&Reverse(b.components().count()))
                .then_with(|| a.cmp(b))
        });

        stale
            .into_iter()
            .map(|(path, kind)| SyncAction::Delete {
                path: path.clone(),
                kind,
            })
            .collect()
    }

    fn is_stale(source: &TreeSnapshot, path: &Path, kind: EntryKind) -> bool {
        if Self::is_protected(source, path) {
            return false;
        }
        // Links and special files in the replica are always replaced, never
        // written through.
        !matches!(
            (kind, source.get(path)),
            (EntryKind::Directory, Some(EntryKind::Directory))
                | (EntryKind::File, Some(EntryKind::File))
        )
    }

    /// A replica path is protected when it sits at or below a source path that
    /// exists but is not mirrored: an unreadable entry, or a link or special
    /// file the scanner did not descend into.
    fn is_protected(source: &TreeSnapshot, path: &Path) -> bool {
        path.ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| {
                source.skipped.contains(p)
                    || matches!(
                        source.get(p),
                        Some(EntryKind::Symlink) | Some(EntryKind::Other)
                    )
            })
    }

    async fn compare(
        &self,
        source: &TreeSnapshot,
        replica: &TreeSnapshot,
        path: &Path,
    ) -> SyncAction {
        let source_file = source.absolute(path);
        let replica_file = replica.absolute(path);

        match self.hasher.same_content(&source_file, &replica_file).await {
            Ok(true) => SyncAction::Skip {
                path: path.to_path_buf(),
            },
            Ok(false) => SyncAction::Copy {
                path: path.to_path_buf(),
            },
            Err(e) => {
                warn!(
                    "Could not compare {}, scheduling a copy: {}",
                    path.display(),
                    e
                );
                SyncAction::Copy {
                    path: path.to_path_buf(),
                }
            }
        }
    }
}
