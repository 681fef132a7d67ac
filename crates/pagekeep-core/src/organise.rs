//! Rename raw PageSpeed Insights responses to the canonical artifact name
//! `<page-slug>-<strategy>-<YYYY-MM-DD-HHMMSS>.json`.
//!
//! The name is derived from the response body, not from the current filename:
//!
//! - slug: `lighthouseResult.requestedUrl` (host for a homepage, path otherwise)
//! - strategy: `lighthouseResult.configSettings.emulatedFormFactor`
//! - timestamp: `lighthouseResult.fetchTime`, formatted in its own offset

use crate::artifact::response_filename;
use crate::error::{ErrorCode, PagekeepError, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

const STAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

#[derive(Debug, Default, Deserialize)]
struct PsiResponse {
    #[serde(rename = "lighthouseResult", default)]
    lighthouse_result: LighthouseResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LighthouseResult {
    requested_url: Option<String>,
    config_settings: ConfigSettings,
    fetch_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigSettings {
    emulated_form_factor: Option<String>,
}

/// Why a response file was left alone.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("could not read file: {0}")]
    Unreadable(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing required data (URL, strategy, or fetchTime)")]
    MissingFields,

    #[error("cannot derive a slug from URL {0:?}")]
    BadUrl(String),

    #[error("unrecognised fetchTime {0:?}")]
    BadTimestamp(String),

    #[error("a file named '{0}' already exists")]
    TargetExists(String),

    #[error("rename failed: {0}")]
    RenameFailed(io::Error),
}

impl SkipReason {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RenameFailed(_) | Self::TargetExists(_) => ErrorCode::RenameFailed,
            _ => ErrorCode::InvalidArtifactJson,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrganiseOutcome {
    Renamed { to: PathBuf },
    WouldRename { to: PathBuf },
    AlreadyNamed,
    Skipped { code: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganiseEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: OrganiseOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrganiseReport {
    pub directory: PathBuf,
    pub files: Vec<OrganiseEntry>,
}

impl OrganiseReport {
    #[must_use]
    pub fn renamed(&self) -> usize {
        self.files
            .iter()
            .filter(|f| {
                matches!(
                    f.outcome,
                    OrganiseOutcome::Renamed { .. } | OrganiseOutcome::WouldRename { .. }
                )
            })
            .count()
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, OrganiseOutcome::Skipped { .. }))
            .count()
    }
}

/// Filename-friendly slug for a page URL.
///
/// Homepages become the host without `www.` and with dots replaced by
/// hyphens; other pages become their path with `/` replaced by `_`.
///
/// The URL is normalised by the WHATWG parser first: hosts are lowercased,
/// dot segments are resolved and non-ASCII path bytes are percent-encoded.
#[must_use]
pub fn slug_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let path = url.path();

    if path.is_empty() || path == "/" {
        let mut netloc = url.host_str()?.to_string();
        if let Some(port) = url.port() {
            netloc = format!("{netloc}:{port}");
        }
        let slug = netloc.replace("www.", "").replace('.', "-");
        return (!slug.is_empty()).then_some(slug);
    }

    Some(path.trim_matches('/').replace('/', "_"))
}

/// Convert an ISO 8601 `fetchTime` to the filename timestamp.
///
/// The wall-clock time in the value's own offset is kept; no conversion to
/// UTC or local time happens.
#[must_use]
pub fn sanitise_timestamp(fetch_time: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(fetch_time) {
        return Some(dt.format(STAMP_FORMAT).to_string());
    }

    NaiveDateTime::parse_from_str(fetch_time, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.format(STAMP_FORMAT).to_string())
}

/// Canonical filename for the response stored at `path`.
///
/// # Errors
///
/// Returns the [`SkipReason`] explaining why no name could be derived.
pub fn canonical_name(path: &Path) -> std::result::Result<String, SkipReason> {
    let content = fs::read_to_string(path)?;
    canonical_name_from_json(&content)
}

fn canonical_name_from_json(content: &str) -> std::result::Result<String, SkipReason> {
    let response: PsiResponse = serde_json::from_str(content)?;
    let result = response.lighthouse_result;

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(url), Some(strategy), Some(fetch_time)) = (
        non_empty(result.requested_url),
        non_empty(result.config_settings.emulated_form_factor),
        non_empty(result.fetch_time),
    ) else {
        return Err(SkipReason::MissingFields);
    };

    let slug = slug_from_url(&url).ok_or_else(|| SkipReason::BadUrl(url.clone()))?;
    let stamp =
        sanitise_timestamp(&fetch_time).ok_or_else(|| SkipReason::BadTimestamp(fetch_time.clone()))?;

    Ok(response_filename(&slug, &strategy, &stamp))
}

/// `planned` holds the targets a dry run has already promised, so a second
/// source with the same canonical name is reported the way a real run would
/// treat it.
fn organise_file(
    path: &Path,
    dry_run: bool,
    planned: &mut BTreeSet<PathBuf>,
) -> std::result::Result<OrganiseOutcome, SkipReason> {
    let new_name = canonical_name(path)?;
    let target = path.with_file_name(&new_name);

    if target == path {
        return Ok(OrganiseOutcome::AlreadyNamed);
    }
    if target.exists() || planned.contains(&target) {
        return Err(SkipReason::TargetExists(new_name));
    }
    if dry_run {
        planned.insert(target.clone());
        return Ok(OrganiseOutcome::WouldRename { to: target });
    }

    fs::rename(path, &target).map_err(SkipReason::RenameFailed)?;
    Ok(OrganiseOutcome::Renamed { to: target })
}

/// Rename every `*.json` file under `root` to its canonical name.
///
/// # Errors
///
/// Only a missing root is an error; per-file problems become
/// [`OrganiseOutcome::Skipped`].
pub fn organise_directory(root: &Path, dry_run: bool) -> Result<OrganiseReport> {
    if !root.is_dir() {
        return Err(PagekeepError::DirectoryNotFound(root.to_path_buf()));
    }

    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    candidates.sort();

    info!(count = candidates.len(), "found JSON files to process");

    let mut report = OrganiseReport {
        directory: root.to_path_buf(),
        files: Vec::with_capacity(candidates.len()),
    };
    let mut planned = BTreeSet::new();

    for path in candidates {
        let outcome = match organise_file(&path, dry_run, &mut planned) {
            Ok(outcome) => {
                match &outcome {
                    OrganiseOutcome::Renamed { to } => {
                        info!(from = %path.display(), to = %to.display(), "renamed");
                    }
                    OrganiseOutcome::WouldRename { to } => {
                        info!(from = %path.display(), to = %to.display(), "DRY RUN: would rename");
                    }
                    OrganiseOutcome::AlreadyNamed => {
                        debug!(path = %path.display(), "already named correctly");
                    }
                    OrganiseOutcome::Skipped { .. } => {}
                }
                outcome
            }
            Err(reason) => {
                warn!(path = %path.display(), code = %reason.code(), %reason, "skipping");
                OrganiseOutcome::Skipped {
                    code: reason.code().code(),
                    reason: reason.to_string(),
                }
            }
        };
        report.files.push(OrganiseEntry { path, outcome });
    }

    info!(
        renamed = report.renamed(),
        skipped = report.skipped(),
        "organisation complete"
    );
    Ok(report)
}
