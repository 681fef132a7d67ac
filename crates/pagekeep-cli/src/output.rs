//! Shared output layer for pretty/text/JSON reports on stdout.
//!
//! Logs go to stderr (and the log file); this module only renders the final
//! report of a run.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use pagekeep_core::organise::{OrganiseOutcome, OrganiseReport};
use pagekeep_core::prune::FileOutcome;
use pagekeep_core::retention::RunReport;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// Write a section heading followed by a separator.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// Render a left-aligned key/value line in human output.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<12} {}", format!("{key}:"), value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, visual framing).
    Pretty,
    /// Compact plain text for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Core resolution logic, separated from I/O for testability.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    if let Some(val) = format_env {
        match val.to_lowercase().as_str() {
            "json" => return OutputMode::Json,
            "text" => return OutputMode::Text,
            "pretty" => return OutputMode::Pretty,
            _ => {} // unknown value, fall through to TTY detection
        }
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from CLI flags, environment, and TTY defaults.
#[must_use]
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(format_flag, json_flag, env_val.as_deref(), is_tty)
}

/// Render a serializable value with explicit pretty/text renderers.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_mode<T: Serialize>(
    w: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *w, value)?;
            writeln!(w)?;
        }
        OutputMode::Text => text_fn(value, w)?,
        OutputMode::Pretty => pretty_fn(value, w)?,
    }
    Ok(())
}

fn outcome_label(outcome: &FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::DryRunReported => "would-remove",
        FileOutcome::Removed => "deleted",
        FileOutcome::ArchivedAndRemoved => "archived",
        FileOutcome::Missing => "missing",
        FileOutcome::Failed { .. } => "failed",
    }
}

/// Render the summary of a retention run.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render_run_report(
    w: &mut dyn Write,
    mode: OutputMode,
    report: &RunReport,
) -> anyhow::Result<()> {
    render_mode(
        w,
        mode,
        report,
        |r, w| {
            let c = r.prune.counts();
            writeln!(
                w,
                "artifacts={} kept={} pruned={} missing={} failed={} dry_run={}",
                r.artifacts,
                r.kept,
                c.removed + c.archived + c.dry_run_reported,
                c.missing,
                c.failed,
                r.dry_run
            )?;
            for file in &r.prune.files {
                writeln!(w, "{}\t{}", outcome_label(&file.outcome), file.path.display())?;
            }
            Ok(())
        },
        |r, w| {
            let c = r.prune.counts();
            let heading = if r.dry_run {
                "Retention (dry run)"
            } else {
                "Retention"
            };
            pretty_section(w, heading)?;
            pretty_kv(w, "Directory", r.directory.display().to_string())?;
            pretty_kv(w, "Artifacts", r.artifacts.to_string())?;
            pretty_kv(w, "Kept", r.kept.to_string())?;
            if r.dry_run {
                pretty_kv(w, "Would prune", c.dry_run_reported.to_string())?;
            } else {
                pretty_kv(w, "Deleted", c.removed.to_string())?;
                pretty_kv(w, "Archived", c.archived.to_string())?;
                pretty_kv(w, "Missing", c.missing.to_string())?;
                pretty_kv(w, "Failed", c.failed.to_string())?;
            }
            for file in &r.prune.files {
                if let FileOutcome::Failed { code, reason } = &file.outcome {
                    writeln!(w, "  ! {} [{code}]: {reason}", file.path.display())?;
                }
            }
            Ok(())
        },
    )
}

/// Render the summary of an organiser run.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn render_organise_report(
    w: &mut dyn Write,
    mode: OutputMode,
    report: &OrganiseReport,
) -> anyhow::Result<()> {
    render_mode(
        w,
        mode,
        report,
        |r, w| {
            writeln!(w, "renamed={} skipped={}", r.renamed(), r.skipped())?;
            for file in &r.files {
                match &file.outcome {
                    OrganiseOutcome::Renamed { to } | OrganiseOutcome::WouldRename { to } => {
                        writeln!(w, "renamed\t{}\t{}", file.path.display(), to.display())?;
                    }
                    OrganiseOutcome::AlreadyNamed => {}
                    OrganiseOutcome::Skipped { code, reason } => {
                        writeln!(w, "skipped\t{}\t{code}\t{reason}", file.path.display())?;
                    }
                }
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Organisation Complete")?;
            pretty_kv(w, "Renamed", r.renamed().to_string())?;
            pretty_kv(w, "Skipped", r.skipped().to_string())?;
            Ok(())
        },
    )
}
