//! Configuration types for replisync
//!
//! Type-safe configuration values with validation and serialization support.

use std::fmt;
use std::time::Duration;

/// Read chunk size used when streaming a file through the content hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "usize", into = "usize")
)]
pub struct ChunkSize(usize);

impl ChunkSize {
    /// Minimum chunk size (512B)
    pub const MIN: usize = 512;
    /// Maximum chunk size (16MB)
    pub const MAX: usize = 16 * 1024 * 1024;
    /// Default chunk size (8KB)
    pub const DEFAULT: usize = 8 * 1024;

    /// Create a new chunk size with validation
    pub fn new(size: usize) -> Result<Self, String> {
        if size < Self::MIN {
            Err(format!("Chunk size {} is below minimum {}", size, Self::MIN))
        } else if size > Self::MAX {
            Err(format!("Chunk size {} exceeds maximum {}", size, Self::MAX))
        } else if !size.is_power_of_two() {
            Err(format!("Chunk size {} must be a power of two", size))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the chunk size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChunkSize> for usize {
    fn from(value: ChunkSize) -> Self {
        value.0
    }
}

/// Delay between the end of one run and the start of the next, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u64", into = "u64")
)]
pub struct SyncInterval(u64);

impl SyncInterval {
    /// Default interval (one minute)
    pub const DEFAULT_SECS: u64 = 60;

    /// Create an interval from seconds; zero is rejected
    pub fn from_secs(secs: u64) -> Result<Self, String> {
        if secs == 0 {
            Err("Interval must be a positive number of seconds".to_string())
        } else {
            Ok(Self(secs))
        }
    }

    /// Create an interval from minutes, the unit operators usually think in
    pub fn from_minutes(minutes: u64) -> Result<Self, String> {
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| format!("Interval of {} minutes is too large", minutes))?;
        Self::from_secs(secs)
    }

    /// Get the interval in seconds
    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// Get the interval as a duration
    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for SyncInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_SECS)
    }
}

impl TryFrom<u64> for SyncInterval {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_secs(value)
    }
}

impl From<SyncInterval> for u64 {
    fn from(value: SyncInterval) -> Self {
        value.0
    }
}

impl fmt::Display for SyncInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Content hash algorithm used for change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum HashAlgorithm {
    /// BLAKE3, 256-bit digest
    #[default]
    Blake3,
    /// XXH3, 128-bit digest
    Xxh3,
}

impl HashAlgorithm {
    /// Digest length in bytes
    pub fn digest_len(self) -> usize {
        match self {
            Self::Blake3 => 32,
            Self::Xxh3 => 16,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Xxh3 => write!(f, "xxh3"),
        }
    }
}

/// How symbolic links in the source tree are treated during scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SymlinkPolicy {
    /// Links are not mirrored; their replica counterparts are left alone
    #[default]
    Skip,
    /// Links are resolved and their targets mirrored as regular entries
    Follow,
}
