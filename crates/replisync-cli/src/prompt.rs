//! Operator confirmations asked before the first run

use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use replisync_config::{params::is_empty_dir, SyncParams};
use std::path::Path;
use tracing::info;

/// Make sure the replica folder exists, offering to create it.
///
/// Returns `false` when the operator declines.
pub fn ensure_replica_exists(replica: &Path, assume_yes: bool) -> Result<bool> {
    if replica.is_dir() {
        return Ok(true);
    }

    let prompt = format!(
        "{} does not exist, do you wish to create it?",
        style(replica.display()).cyan()
    );
    if !confirm(&prompt, assume_yes)? {
        return Ok(false);
    }

    std::fs::create_dir_all(replica)
        .with_context(|| format!("Failed to create {}", replica.display()))?;
    info!("Created replica folder {}", replica.display());
    Ok(true)
}

/// Ask before mirroring into a replica that already holds entries, since
/// anything not present in the source will be deleted.
pub fn confirm_replica_overwrite(params: &SyncParams, assume_yes: bool) -> Result<bool> {
    if is_empty_dir(&params.replica)? {
        return Ok(true);
    }

    let prompt = format!(
        "{} is not empty, continuing will delete all files not present in {}. Do you wish to continue?",
        style(params.replica.display()).cyan(),
        style(params.source.display()).cyan()
    );
    confirm(&prompt, assume_yes)
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Confirmation needs an interactive terminal; pass --yes to skip it")
}
