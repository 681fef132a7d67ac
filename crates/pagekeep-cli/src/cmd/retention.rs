//! `retention`: thin out a directory of PageSpeed artifacts.
//!
//! Recent artifacts keep one file per slug, strategy and day; older ones are
//! thinned to weekly and then monthly representatives. Everything else is
//! deleted, or moved into a zip archive with `--archive`.

use crate::output::{OutputMode, render_run_report, resolve_output_mode};
use anyhow::Context;
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::Parser;
use pagekeep_core::config::{PagekeepConfig, load_config, resolve_config_source};
use pagekeep_core::error::PagekeepError;
use pagekeep_core::prune::FileOutcome;
use pagekeep_core::retention;
use pagekeep_core::PruneOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn};

/// Exit status when the target directory does not exist.
pub const EXIT_DIRECTORY_NOT_FOUND: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "retention",
    version,
    about = "Prune PageSpeed Insights artifacts with a tiered retention policy",
    long_about = None
)]
pub struct RetentionArgs {
    /// Directory to scan recursively for artifacts.
    pub directory: PathBuf,

    /// Report what would be pruned without touching any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Move pruned files into this zip archive instead of deleting them.
    #[arg(long, value_name = "PATH")]
    pub archive: Option<PathBuf>,

    /// Configuration file. Defaults to $PAGEKEEP_CONFIG or ./pagekeep.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append logs to this file. Overrides [retention].log_file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging (lists skipped files).
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format for the final report.
    #[arg(long, value_enum)]
    pub format: Option<OutputMode>,

    /// Emit the report as JSON (shorthand for --format json).
    #[arg(long)]
    pub json: bool,

    /// Evaluate ages relative to this local time instead of now.
    #[arg(long, hide = true, value_name = "YYYY-MM-DDTHH:MM:SS", value_parser = parse_as_of)]
    pub as_of: Option<NaiveDateTime>,
}

impl RetentionArgs {
    /// Derive the output mode from flags.
    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    /// Reference time for age computations.
    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        self.as_of.unwrap_or_else(|| Local::now().naive_local())
    }

    /// Log file to use: the flag wins over the configured path.
    #[must_use]
    pub fn log_file<'a>(&'a self, config: &'a PagekeepConfig) -> &'a Path {
        self.log_file
            .as_deref()
            .unwrap_or(&config.retention.log_file)
    }

    fn prune_options(&self) -> PruneOptions {
        self.archive
            .clone()
            .map_or_else(PruneOptions::delete, PruneOptions::archive)
            .dry_run(self.dry_run)
    }
}

/// Accept `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, or a bare date
/// (midnight).
pub fn parse_as_of(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid --as-of '{raw}': expected YYYY-MM-DDTHH:MM:SS"))
}

/// Load the configuration named by the flags.
///
/// # Errors
///
/// Returns an error if an explicitly named config is missing or the file is
/// invalid.
pub fn load_retention_config(args: &RetentionArgs) -> anyhow::Result<PagekeepConfig> {
    let source = resolve_config_source(args.config.as_deref());
    load_config(&source)
        .with_context(|| format!("failed to load config from {}", source.path.display()))
}

/// Run one retention pass and write the report to `out`.
///
/// A missing directory is logged and mapped to exit status 2. Per-file
/// failures are part of the report and keep the exit status at 0.
///
/// # Errors
///
/// Returns an error if the configured window is invalid or the report cannot
/// be written.
pub fn run_retention(
    args: &RetentionArgs,
    config: &PagekeepConfig,
    output: OutputMode,
    out: &mut dyn Write,
) -> anyhow::Result<ExitCode> {
    let policy = config
        .retention
        .policy()
        .context("invalid [retention] configuration")?;

    let report = match retention::run(&args.directory, args.now(), &policy, &args.prune_options())
    {
        Ok(report) => report,
        Err(err @ PagekeepError::DirectoryNotFound(_)) => {
            error!(
                code = %err.code(),
                directory = %args.directory.display(),
                hint = err.hint().unwrap_or_default(),
                "{err}"
            );
            return Ok(ExitCode::from(EXIT_DIRECTORY_NOT_FOUND));
        }
        Err(err) => return Err(err.into()),
    };

    for file in &report.prune.files {
        if let FileOutcome::Failed { code, reason } = &file.outcome {
            warn!(%code, path = %file.path.display(), %reason, "file not pruned");
        }
    }
    let failed = report.prune.counts().failed;
    if failed > 0 {
        warn!(failed, "some files could not be pruned");
    }

    render_run_report(out, output, &report)?;
    Ok(ExitCode::SUCCESS)
}
