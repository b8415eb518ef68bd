//! Main synchronization engine

use crate::{
    diff::TreeDiffEngine,
    executor::{ExecutorOptions, SyncExecutor},
    hasher::ContentHasher,
    logger::SyncLogger,
    scanner::TreeScanner,
    scheduler::{PeriodicScheduler, SchedulerReport, SyncRun},
};
use replisync_config::{Config, SyncParams};
use replisync_types::{ChunkSize, Error, HashAlgorithm, Result, RunSummary, SymlinkPolicy};
use std::io::Write;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

/// Synchronization options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// How source symlinks are treated
    pub symlinks: SymlinkPolicy,
    /// Digest algorithm for content comparison
    pub algorithm: HashAlgorithm,
    /// Read size for hashing
    pub chunk_size: ChunkSize,
    /// Write copies through a temporary sibling
    pub staged_copy: bool,
    /// Carry permission bits over to replica files
    pub preserve_permissions: bool,
    /// Mirror audit lines to stdout
    pub console_mirror: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            symlinks: SymlinkPolicy::default(),
            algorithm: HashAlgorithm::default(),
            chunk_size: ChunkSize::default(),
            staged_copy: true,
            preserve_permissions: true,
            console_mirror: true,
        }
    }
}

impl SyncOptions {
    /// Options taken from a merged configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            symlinks: config.scan.symlinks,
            algorithm: config.hashing.algorithm,
            chunk_size: config.hashing.chunk_size,
            staged_copy: config.sync.staged_copy,
            preserve_permissions: config.sync.preserve_permissions,
            console_mirror: config.logging.console_mirror,
        }
    }

    fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            staged_copy: self.staged_copy,
            preserve_permissions: self.preserve_permissions,
        }
    }
}

/// Main synchronization engine
///
/// Wires one run together: scan both trees, diff them, apply the actions,
/// and append the summary to the audit log.
#[derive(Debug)]
pub struct SyncEngine {
    params: SyncParams,
    options: SyncOptions,
    scanner: TreeScanner,
    diff_engine: TreeDiffEngine,
    executor: SyncExecutor,
    logger: SyncLogger,
}

impl SyncEngine {
    /// Create an engine for pre-validated parameters
    pub fn new(params: SyncParams, options: SyncOptions) -> Self {
        let logger = SyncLogger::new(&params.log_file);
        let logger = if options.console_mirror {
            logger
        } else {
            logger.without_mirror()
        };
        let hasher = ContentHasher::new(options.algorithm, options.chunk_size);

        Self {
            scanner: TreeScanner::source(options.symlinks),
            diff_engine: TreeDiffEngine::new(hasher),
            executor: SyncExecutor::new(
                &params.source,
                &params.replica,
                options.executor_options(),
            ),
            logger,
            params,
            options,
        }
    }

    /// Mirror audit lines to `mirror` instead of stdout
    pub fn with_mirror(mut self, mirror: Box<dyn Write + Send>) -> Self {
        self.logger = SyncLogger::new(&self.params.log_file).with_mirror(mirror);
        self
    }

    /// Parameters this engine was built with
    pub fn params(&self) -> &SyncParams {
        &self.params
    }

    /// Options this engine was built with
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Perform a single run.
    ///
    /// Per-path failures are counted in the summary; an error is returned
    /// only when a tree cannot be scanned, the summary cannot be logged, or
    /// the token was already cancelled.
    pub async fn run_once(&mut self, token: &CancellationToken) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        self.run_inner(token).instrument(span).await
    }

    /// Run on a fixed schedule until `token` is cancelled
    pub async fn run_periodic(&mut self, token: CancellationToken) -> SchedulerReport {
        let mut scheduler = PeriodicScheduler::new(self.params.interval, token);
        scheduler.start(self).await
    }

    async fn run_inner(&mut self, token: &CancellationToken) -> Result<RunSummary> {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let start_time = Instant::now();
        info!(
            "Starting sync: {} -> {}",
            self.params.source.display(),
            self.params.replica.display()
        );

        let source = self
            .scanner
            .scan_blocking(self.params.source.clone())
            .await?;
        let replica = TreeScanner::replica()
            .scan_blocking(self.params.replica.clone())
            .await?;
        info!(
            "Found {} files in source, {} in replica",
            source.file_count(),
            replica.file_count()
        );

        let actions = self.diff_engine.diff(&source, &replica).await;
        let mut summary = self
            .executor
            .apply(&actions, &mut self.logger, token)
            .await;
        summary.duration = start_time.elapsed();

        self.logger.record_summary(&summary).await?;

        info!(
            "Sync completed: copied {}, removed {}, unaltered {}, failed {} in {:?}",
            summary.copied, summary.removed, summary.identical, summary.failed, summary.duration
        );
        Ok(summary)
    }
}

impl SyncRun for SyncEngine {
    async fn run(&mut self, token: &CancellationToken) -> Result<RunSummary> {
        self.run_once(token).await
    }
}
