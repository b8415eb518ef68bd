//! Periodic re-execution of sync runs
//!
//! The scheduler owns the loop: it calls a [`SyncRun`] immediately, waits the
//! configured interval after the run completes, and repeats until the
//! cancellation token fires or the optional run limit is reached. Runs never
//! overlap.

use replisync_types::{Error, ErrorSeverity, Result, RunSummary, SyncInterval};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One complete scan, diff, execute, and log cycle
#[allow(async_fn_in_trait)]
pub trait SyncRun {
    /// Perform one run, checking `token` between actions
    async fn run(&mut self, token: &CancellationToken) -> Result<RunSummary>;
}

/// Where the scheduler is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started yet
    Idle,
    /// A run is in progress
    Running,
    /// Waiting for the next run
    Scheduled,
    /// Cancelled or finished; no further runs
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of a scheduler session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    /// Runs started
    pub runs: u64,
    /// Runs that returned an error
    pub failed_runs: u64,
    /// Whether the session ended through cancellation
    pub stopped_by_cancel: bool,
}

/// Repeats a run at a fixed delay measured from the end of each run
#[derive(Debug)]
pub struct PeriodicScheduler {
    interval: SyncInterval,
    token: CancellationToken,
    max_runs: Option<u64>,
    state: SchedulerState,
}

impl PeriodicScheduler {
    /// Create a scheduler that runs until `token` is cancelled
    pub fn new(interval: SyncInterval, token: CancellationToken) -> Self {
        Self {
            interval,
            token,
            max_runs: None,
            state: SchedulerState::Idle,
        }
    }

    /// Stop on its own after `max_runs` runs
    pub fn with_max_runs(mut self, max_runs: u64) -> Self {
        self.max_runs = Some(max_runs);
        self
    }

    /// Current state
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Delay between the end of one run and the start of the next
    pub fn interval(&self) -> SyncInterval {
        self.interval
    }

    /// Drive `target` until cancelled or the run limit is reached.
    ///
    /// A run that returns an error is logged and the next cycle goes ahead
    /// as usual. Cancellation during the wait returns at once; a run in
    /// progress sees the token itself and winds down between actions.
    pub async fn start<R: SyncRun>(&mut self, target: &mut R) -> SchedulerReport {
        let mut report = SchedulerReport::default();
        info!("Scheduler started, running every {}", self.interval);

        loop {
            if self.token.is_cancelled() {
                report.stopped_by_cancel = true;
                break;
            }

            self.state = SchedulerState::Running;
            report.runs += 1;
            match target.run(&self.token).await {
                Ok(summary) => debug!(
                    "Run {} finished: copied {}, removed {}, unaltered {}",
                    report.runs, summary.copied, summary.removed, summary.identical
                ),
                Err(e) => {
                    if log_run_error(report.runs, self.interval, &e) {
                        report.failed_runs += 1;
                    }
                }
            }

            if self.max_runs.is_some_and(|max| report.runs >= max) {
                break;
            }
            if self.token.is_cancelled() {
                report.stopped_by_cancel = true;
                break;
            }

            self.state = SchedulerState::Scheduled;
            debug!("Next run in {}", self.interval);
            tokio::select! {
                () = self.token.cancelled() => {
                    report.stopped_by_cancel = true;
                    break;
                }
                () = tokio::time::sleep(self.interval.as_duration()) => {}
            }
        }

        self.state = SchedulerState::Stopped;
        info!(
            "Scheduler stopped after {} runs ({} failed)",
            report.runs, report.failed_runs
        );
        report
    }
}

/// Log a run error at a level matching its severity. Returns whether it
/// counts as a failed run; cancellation does not.
fn log_run_error(run: u64, interval: SyncInterval, e: &Error) -> bool {
    match e.severity() {
        ErrorSeverity::Low => {
            debug!("Run {} ended early: {}", run, e);
            false
        }
        _ if e.is_recoverable() => {
            warn!("Run {} failed, retrying in {}: {}", run, interval, e);
            true
        }
        _ => {
            error!("Run {} failed: {}", run, e);
            true
        }
    }
}
