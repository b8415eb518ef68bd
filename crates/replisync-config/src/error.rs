//! Errors raised while loading configuration and validating sync roots

use replisync_types::Error as ReplisyncError;
use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration or a pair of sync roots was rejected
///
/// Every variant is fatal: no run is attempted once one of these surfaces.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file, root or log location could not be read or written
    #[error("Cannot access '{path}': {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Layers merged but a value is out of range
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// A setting needed to start a run was given neither on the command line nor in config
    #[error("Missing required configuration: {key}")]
    MissingRequired {
        /// Dotted key, e.g. `sync.source`
        key: String,
    },

    /// A sync root or log path failed validation
    #[error("Invalid path '{path}': {message}")]
    InvalidPath {
        /// Offending path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration could not be rendered to yaml, toml or json
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// The layered sources could not be merged or deserialized
    #[error("Failed to merge configuration sources: {0}")]
    Merge(#[from] config::ConfigError),
}

impl From<ConfigError> for ReplisyncError {
    fn from(error: ConfigError) -> Self {
        ReplisyncError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Out-of-range value
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Required key not set anywhere
    pub fn missing_required<S: Into<String>>(key: S) -> Self {
        Self::MissingRequired { key: key.into() }
    }

    /// Rejected sync root or log path
    pub fn invalid_path<P: Into<PathBuf>, M: Into<String>>(path: P, message: M) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn serialization(format: &str, error: impl std::fmt::Display) -> Self {
        Self::Serialization {
            message: format!("Failed to serialize to {}: {}", format, error),
        }
    }
}
