//! `organise-reports`: give raw PageSpeed responses their canonical names.

use crate::output::{OutputMode, render_organise_report, resolve_output_mode};
use anyhow::Context;
use clap::Parser;
use pagekeep_core::config::{PagekeepConfig, load_config, resolve_config_source};
use pagekeep_core::error::PagekeepError;
use pagekeep_core::organise::organise_directory;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "organise-reports",
    version,
    about = "Rename PageSpeed Insights responses to <slug>-<strategy>-<timestamp>.json",
    long_about = None
)]
pub struct OrganiseArgs {
    /// Directory to organise. Defaults to [paths].debug_dir.
    pub directory: Option<PathBuf>,

    /// Report planned renames without touching any file.
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file. Defaults to $PAGEKEEP_CONFIG or ./pagekeep.toml.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format for the final report.
    #[arg(long, value_enum)]
    pub format: Option<OutputMode>,

    /// Emit the report as JSON (shorthand for --format json).
    #[arg(long)]
    pub json: bool,
}

impl OrganiseArgs {
    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    /// Directory to work on: the argument, else the configured debug dir.
    #[must_use]
    pub fn directory<'a>(&'a self, config: &'a PagekeepConfig) -> &'a Path {
        self.directory
            .as_deref()
            .unwrap_or(&config.paths.debug_dir)
    }
}

/// Load the configuration named by the flags.
///
/// # Errors
///
/// Returns an error if an explicitly named config is missing or the file is
/// invalid.
pub fn load_organise_config(args: &OrganiseArgs) -> anyhow::Result<PagekeepConfig> {
    let source = resolve_config_source(args.config.as_deref());
    load_config(&source)
        .with_context(|| format!("failed to load config from {}", source.path.display()))
}

/// Rename every response under the target directory and write the report.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn run_organise(
    args: &OrganiseArgs,
    config: &PagekeepConfig,
    output: OutputMode,
    out: &mut dyn Write,
) -> anyhow::Result<ExitCode> {
    let root = args.directory(config);
    info!(directory = %root.display(), dry_run = args.dry_run, "organising reports");

    let report = match organise_directory(root, args.dry_run) {
        Ok(report) => report,
        Err(err @ PagekeepError::DirectoryNotFound(_)) => {
            error!(code = %err.code(), directory = %root.display(), "{err}");
            return Ok(ExitCode::from(super::retention::EXIT_DIRECTORY_NOT_FOUND));
        }
        Err(err) => return Err(err.into()),
    };

    render_organise_report(out, output, &report)?;
    Ok(ExitCode::SUCCESS)
}
