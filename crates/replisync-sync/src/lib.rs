//! One-way periodic directory mirroring for replisync
//!
//! This crate makes a replica directory tree match a source tree and keeps it
//! that way:
//!
//! - **Content Hashing**: streamed BLAKE3 or XXH3 digests decide whether a file changed
//! - **Tree Scanning**: recursive, sorted walks of both trees
//! - **Diffing**: per-path delete, copy, or skip decisions, deletions deepest-first
//! - **Execution**: partial-failure tolerant application with staged copies
//! - **Audit Log**: append-only, timestamped record of every mutation
//! - **Scheduling**: re-runs at a fixed delay until cancelled
//!
//! # Examples
//!
//! ```rust,no_run
//! use replisync_config::SyncParams;
//! use replisync_sync::{SyncEngine, SyncOptions};
//! use replisync_types::SyncInterval;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = SyncParams::validate("source", "replica", "log.txt", SyncInterval::from_secs(60)?)?;
//! let mut engine = SyncEngine::new(params, SyncOptions::default());
//! let summary = engine.run_once(&CancellationToken::new()).await?;
//! println!("Copied {} files, removed {}", summary.copied, summary.removed);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod diff;
pub mod engine;
pub mod executor;
pub mod hasher;
pub mod logger;
pub mod scanner;
pub mod scheduler;

pub use diff::TreeDiffEngine;
pub use engine::{SyncEngine, SyncOptions};
pub use executor::{ExecutorOptions, SyncExecutor};
pub use hasher::ContentHasher;
pub use logger::{SyncEvent, SyncLogger};
pub use scanner::{TreeScanner, TreeSnapshot};
pub use scheduler::{PeriodicScheduler, SchedulerReport, SchedulerState, SyncRun};
