//! Core type system and error handling for replisync
//!
//! This crate provides the foundational types shared by every replisync crate:
//!
//! - **Error handling**: the error taxonomy with kinds and severity levels
//! - **Core types**: scan entry kinds, sync actions, digests, and run summaries
//! - **Configuration**: validated value types such as chunk size and interval
//!
//! # Features
//!
//! - `serde` (default): Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use replisync_types::{Result, RunSummary, SyncAction};
//!
//! fn tally(actions: &[SyncAction]) -> Result<RunSummary> {
//!     let mut summary = RunSummary::new();
//!     summary.copied = actions.iter().filter(|a| a.is_copy()).count() as u64;
//!     summary.identical = actions.iter().filter(|a| a.is_skip()).count() as u64;
//!     Ok(summary)
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{ChunkSize, HashAlgorithm, SymlinkPolicy, SyncInterval};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use types::*;
