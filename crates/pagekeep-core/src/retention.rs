//! One full retention pass: scan, dedup, select, prune.

use crate::error::{PagekeepError, Result};
use crate::policy::{RetentionPlan, RetentionPolicy, plan_retention};
use crate::prune::{BatchReport, PruneOptions, prune_files};
use crate::scan::scan_directory;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Summary of a retention pass over one directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub directory: PathBuf,
    pub dry_run: bool,
    pub artifacts: usize,
    pub kept: usize,
    pub skipped_files: usize,
    pub prune: BatchReport,
}

/// Scan `root` and compute the retention plan without touching anything.
///
/// # Errors
///
/// Returns [`PagekeepError::DirectoryNotFound`] if `root` is not a directory.
pub fn plan_directory(
    root: &Path,
    now: NaiveDateTime,
    policy: &RetentionPolicy,
) -> Result<(RetentionPlan, usize)> {
    if !root.is_dir() {
        return Err(PagekeepError::DirectoryNotFound(root.to_path_buf()));
    }

    let inventory = scan_directory(root);
    info!(
        artifacts = inventory.len(),
        skipped = inventory.skipped,
        "scan complete"
    );
    Ok((plan_retention(&inventory, now, policy), inventory.skipped))
}

/// Run the retention pipeline against `root`.
///
/// # Errors
///
/// Only a missing root is an error; per-file failures are reported in
/// [`RunReport::prune`].
pub fn run(
    root: &Path,
    now: NaiveDateTime,
    policy: &RetentionPolicy,
    options: &PruneOptions,
) -> Result<RunReport> {
    info!(directory = %root.display(), "starting pruning process");
    if options.dry_run {
        info!("DRY RUN MODE: no files will be deleted or moved");
    }

    let (plan, skipped_files) = plan_directory(root, now, policy)?;
    let artifacts = plan.keep.len() + plan.prune.len();

    let prune = if plan.prune.is_empty() {
        info!("no files to prune");
        BatchReport::default()
    } else {
        info!(count = plan.prune.len(), "found files to prune");
        prune_files(&plan.prune, options)
    };

    info!("pruning process complete");
    Ok(RunReport {
        directory: root.to_path_buf(),
        dry_run: options.dry_run,
        artifacts,
        kept: plan.keep.len(),
        skipped_files,
        prune,
    })
}
