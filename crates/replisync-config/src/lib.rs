//! Configuration management system for replisync
//!
//! Configuration is layered: built-in defaults, then an optional YAML, TOML,
//! or JSON file, then `REPLISYNC_*` environment variables. The merged result
//! is turned into [`SyncParams`], the pre-validated inputs a sync run accepts.
//!
//! # Examples
//!
//! ```rust,no_run
//! use replisync_config::{ConfigBuilder, SyncParams};
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("replisync.yaml")
//!     .add_env_prefix("REPLISYNC")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! let params = SyncParams::from_config(&config).expect("invalid sync parameters");
//! println!("Mirroring every {}", params.interval);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use replisync_types::{ChunkSize, HashAlgorithm, SymlinkPolicy, SyncInterval};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod error;
pub mod loader;
pub mod params;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use params::SyncParams;

/// Main configuration structure for replisync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Roots, log file, and schedule
    pub sync: SyncConfig,
    /// Tree scanning behaviour
    pub scan: ScanConfig,
    /// Content hashing behaviour
    pub hashing: HashingConfig,
    /// Diagnostic logging and console output
    pub logging: LoggingConfig,
}

/// Roots, log file, and schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Authoritative tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Mirrored tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica: Option<PathBuf>,
    /// Append-only audit log, or a directory to hold `log.txt`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Seconds between the end of one run and the start of the next
    pub interval_secs: SyncInterval,
    /// Write copies to a temporary sibling and rename over the target
    pub staged_copy: bool,
    /// Carry permission bits over to replica files
    pub preserve_permissions: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: None,
            replica: None,
            log_file: None,
            interval_secs: SyncInterval::default(),
            staged_copy: true,
            preserve_permissions: true,
        }
    }
}

/// Tree scanning behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// What to do with symbolic links found in the source tree
    pub symlinks: SymlinkPolicy,
}

/// Content hashing behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Read size when streaming files through the hasher
    pub chunk_size: ChunkSize,
}

/// Diagnostic logging and console output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Diagnostic log level
    pub level: String,
    /// Mirror audit log lines to stdout
    pub console_mirror: bool,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_mirror: true,
            colored_output: true,
        }
    }
}
