//! Pruning executor.
//!
//! Every file in the prune-set moves from pending to exactly one terminal
//! [`FileOutcome`]. A failure on one file never changes the outcome of another.

use crate::archive::{ArchiveSink, ZipSink};
use crate::error::ErrorCode;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What happens to a pruned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposal {
    Delete,
    Archive(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneOptions {
    pub disposal: Disposal,
    pub dry_run: bool,
}

impl PruneOptions {
    #[must_use]
    pub const fn delete() -> Self {
        Self {
            disposal: Disposal::Delete,
            dry_run: false,
        }
    }

    #[must_use]
    pub const fn archive(path: PathBuf) -> Self {
        Self {
            disposal: Disposal::Archive(path),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Terminal state of one pruned file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    DryRunReported,
    Removed,
    ArchivedAndRemoved,
    /// Already gone when we got to it.
    Missing,
    Failed { code: &'static str, reason: String },
}

impl FileOutcome {
    fn failed(code: ErrorCode, reason: impl ToString) -> Self {
        Self::Failed {
            code: code.code(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file outcomes for one pruning pass, in prune-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub dry_run_reported: usize,
    pub removed: usize,
    pub archived: usize,
    pub missing: usize,
    pub failed: usize,
}

impl BatchReport {
    #[must_use]
    pub fn counts(&self) -> BatchCounts {
        let mut counts = BatchCounts::default();
        for file in &self.files {
            match file.outcome {
                FileOutcome::DryRunReported => counts.dry_run_reported += 1,
                FileOutcome::Removed => counts.removed += 1,
                FileOutcome::ArchivedAndRemoved => counts.archived += 1,
                FileOutcome::Missing => counts.missing += 1,
                FileOutcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn outcome_of(&self, path: &Path) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.outcome)
    }

    fn push(&mut self, path: &Path, outcome: FileOutcome) {
        self.files.push(FileReport {
            path: path.to_path_buf(),
            outcome,
        });
    }
}

/// Apply `options` to every file in `files`.
#[must_use]
pub fn prune_files(files: &BTreeSet<PathBuf>, options: &PruneOptions) -> BatchReport {
    if options.dry_run {
        return report_dry_run(files, &options.disposal);
    }

    match &options.disposal {
        Disposal::Delete => delete_all(files),
        Disposal::Archive(archive) => {
            info!(archive = %archive.display(), "archiving files");
            match ZipSink::open(archive) {
                Ok(sink) => archive_all(files, Box::new(sink)),
                Err(err) => {
                    error!(archive = %archive.display(), error = %err, code = %err.code(), "cannot open archive; nothing removed");
                    let mut report = BatchReport::default();
                    for path in files {
                        report.push(path, FileOutcome::failed(err.code(), &err));
                    }
                    report
                }
            }
        }
    }
}

fn report_dry_run(files: &BTreeSet<PathBuf>, disposal: &Disposal) -> BatchReport {
    let mut report = BatchReport::default();
    for path in files {
        match disposal {
            Disposal::Delete => info!(path = %path.display(), "DRY RUN: would delete"),
            Disposal::Archive(archive) => info!(
                path = %path.display(),
                archive = %archive.display(),
                "DRY RUN: would archive"
            ),
        }
        report.push(path, FileOutcome::DryRunReported);
    }
    report
}

fn delete_all(files: &BTreeSet<PathBuf>) -> BatchReport {
    info!("deleting files");
    let mut report = BatchReport::default();
    for path in files {
        let outcome = match fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "deleted");
                FileOutcome::Removed
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "file not found for deletion, it might have been already removed");
                FileOutcome::Missing
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "error deleting file");
                FileOutcome::failed(ErrorCode::FileRemoveFailed, err)
            }
        };
        report.push(path, outcome);
    }
    report
}

/// Stage every file into `sink`, finalise it, then remove the sources whose
/// entries made it in.
///
/// Sources are only removed once the archive has been finalised.
pub fn archive_all(files: &BTreeSet<PathBuf>, mut sink: Box<dyn ArchiveSink>) -> BatchReport {
    let mut report = BatchReport::default();
    let mut staged = Vec::new();

    for path in files {
        let outcome = match stage(sink.as_mut(), path) {
            Ok(()) => {
                staged.push(report.files.len());
                // Placeholder until the archive is finalised.
                FileOutcome::ArchivedAndRemoved
            }
            Err(outcome) => outcome,
        };
        report.push(path, outcome);
    }

    if let Err(err) = sink.finish() {
        error!(error = %err, "archive could not be finalised; keeping staged files");
        for idx in staged {
            report.files[idx].outcome = FileOutcome::failed(
                ErrorCode::ArchiveFinalizeFailed,
                format!("archive not finalised: {err}"),
            );
        }
        return report;
    }

    for idx in staged {
        let path = report.files[idx].path.clone();
        report.files[idx].outcome = match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "archived and removed");
                FileOutcome::ArchivedAndRemoved
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "archived file vanished before removal");
                FileOutcome::Missing
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "archived but could not remove");
                FileOutcome::failed(
                    ErrorCode::FileRemoveFailed,
                    format!("archived but not removed: {err}"),
                )
            }
        };
    }

    report
}

fn stage(sink: &mut dyn ArchiveSink, path: &Path) -> Result<(), FileOutcome> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        error!(path = %path.display(), "file has no usable basename");
        return Err(FileOutcome::failed(
            ErrorCode::ArchiveWriteFailed,
            "file has no usable basename",
        ));
    };

    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "file not found for archiving, it might have been already removed");
            return Err(FileOutcome::Missing);
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "error reading file for archive");
            return Err(FileOutcome::failed(ErrorCode::ArchiveWriteFailed, err));
        }
    };

    sink.append(name, &contents).map_err(|err| {
        error!(path = %path.display(), error = %err, code = %err.code(), "error archiving file");
        FileOutcome::failed(ErrorCode::ArchiveWriteFailed, err)
    })
}
