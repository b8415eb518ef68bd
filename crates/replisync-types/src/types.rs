//! Core data types for replisync
//!
//! Scan entries, the per-path actions produced by diffing two trees, content
//! digests, and the counters accumulated over one run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::HashAlgorithm;

/// Kind of filesystem entry found while scanning a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link that was not followed
    Symlink,
    /// Fifo, socket, or device node
    Other,
}

impl EntryKind {
    /// Whether this entry is a directory
    pub fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Whether this entry is a regular file
    pub fn is_file(self) -> bool {
        matches!(self, Self::File)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
            Self::Symlink => write!(f, "symlink"),
            Self::Other => write!(f, "special file"),
        }
    }
}

/// A single decision about one relative path, produced by the diff
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SyncAction {
    /// Remove a stale replica entry
    Delete {
        /// Path relative to the replica root
        path: PathBuf,
        /// Kind of the replica entry being removed
        kind: EntryKind,
    },
    /// Copy a missing or changed file from source to replica
    Copy {
        /// Path relative to both roots
        path: PathBuf,
    },
    /// The replica already holds identical content
    Skip {
        /// Path relative to both roots
        path: PathBuf,
    },
}

impl SyncAction {
    /// Relative path this action applies to
    pub fn path(&self) -> &Path {
        match self {
            Self::Delete { path, .. } | Self::Copy { path } | Self::Skip { path } => path,
        }
    }

    /// Whether this action removes an entry
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    /// Whether this action copies a file
    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy { .. })
    }

    /// Whether this action leaves the replica untouched
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

/// Content fingerprint of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: HashAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Wrap raw digest bytes produced by `algorithm`
    pub fn new(algorithm: HashAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    /// Algorithm that produced this digest
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hexadecimal rendering
    pub fn to_hex(&self) -> String {
        use fmt::Write;

        self.bytes
            .iter()
            .fold(String::with_capacity(self.bytes.len() * 2), |mut out, b| {
                let _ = write!(out, "{:02x}", b);
                out
            })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunSummary {
    /// Files copied to the replica
    pub copied: u64,
    /// Non-directory entries removed from the replica
    pub removed: u64,
    /// Files found identical and left alone
    pub identical: u64,
    /// Directories removed from the replica
    pub directories_removed: u64,
    /// Actions that failed and will be retried by the next run
    pub failed: u64,
    /// Whether the run stopped early on cancellation
    pub interrupted: bool,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl RunSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions that were applied or classified
    pub fn total_processed(&self) -> u64 {
        self.copied + self.removed + self.identical + self.directories_removed + self.failed
    }

    /// Whether the run left the replica untouched
    pub fn is_noop(&self) -> bool {
        self.copied == 0 && self.removed == 0 && self.directories_removed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_digest_identity_includes_algorithm() {
        let blake = Digest::new(HashAlgorithm::Blake3, vec![0xab; 16]);
        let xxh = Digest::new(HashAlgorithm::Xxh3, vec![0xab; 16]);

        let seen: HashSet<Digest> = [blake.clone(), blake.clone(), xxh.clone()]
            .into_iter()
            .collect();

        assert_eq!(seen.len(), 2);
        assert_ne!(blake, xxh);
        assert!(xxh.to_string().starts_with("xxh3:abab"));
    }

    #[test]
    fn test_summary_noop() {
        let mut summary = RunSummary::new();
        summary.identical = 4;
        assert!(summary.is_noop());
        assert_eq!(summary.total_processed(), 4);

        summary.directories_removed = 1;
        assert!(!summary.is_noop());
    }
}
