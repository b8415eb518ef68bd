//! Console output for the replisync CLI
//!
//! Per-file lines and the three summary lines come from the audit logger's
//! console mirror; everything here is framing around them.

use console::style;
use replisync_config::SyncParams;
use replisync_sync::SchedulerReport;
use replisync_types::RunSummary;
use std::path::Path;
use std::time::Duration;

/// Announce what is about to be mirrored
pub fn print_banner(params: &SyncParams, once: bool) {
    println!(
        "{} Mirroring {} to {}",
        style("⟲").blue().bold(),
        style(params.source.display()).cyan(),
        style(params.replica.display()).cyan()
    );
    println!("  Log file: {}", style(params.log_file.display()).dim());
    if once {
        println!("  Single run");
    } else {
        println!(
            "  Every {} after each run, Ctrl-C to stop",
            style(params.interval).yellow()
        );
    }
    println!();
}

/// Counters the summary lines leave out
pub fn print_run_details(summary: &RunSummary) {
    println!();
    if summary.directories_removed > 0 {
        println!(
            "  Directories removed: {}",
            style(summary.directories_removed).green()
        );
    }
    println!(
        "  Failures: {}",
        if summary.failed > 0 {
            style(summary.failed).red()
        } else {
            style(summary.failed).green()
        }
    );
    println!(
        "  Duration: {}",
        style(format_duration(summary.duration)).blue()
    );
}

/// Totals of a scheduler session
pub fn print_report(report: &SchedulerReport) {
    println!();
    println!("{}", style("Session:").bold().underlined());
    println!("  Runs: {}", style(report.runs).green());
    if report.failed_runs > 0 {
        println!("  Failed runs: {}", style(report.failed_runs).red());
    }
}

/// The operator stopped or declined the sync
pub fn print_aborted() {
    println!("{}", style("Sync aborted").yellow());
}

/// Heading printed before a configuration dump
pub fn print_config_header(default: bool) {
    let heading = if default {
        "Default configuration:"
    } else {
        "Current configuration:"
    };
    eprintln!("{} {}", style("⚙").blue().bold(), heading);
}

/// Confirmation that a configuration file was written
pub fn print_config_written(path: &Path) {
    println!(
        "{} Configuration written to {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
}

/// Format duration in human-readable format
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
