//! Filename grammar for PageSpeed Insights artifacts.
//!
//! Two shapes are recognised:
//!
//! - raw API responses: `<slug>-<desktop|mobile>-<YYYY-MM-DD-HHMMSS>.json`
//! - comparison reports: `comparison-report-<slug>-<YYYY-MM-DD-HHMM>.html`
//!
//! Anything else is not an artifact. Classification is pure: it looks at the
//! bare filename only and never touches the filesystem.

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Raw API dump. The slug is non-greedy so it may itself contain hyphens.
static RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<slug>.*?)-(?P<strategy>desktop|mobile)-(?P<y>[0-9]{4})-(?P<mo>[0-9]{2})-(?P<d>[0-9]{2})-(?P<h>[0-9]{2})(?P<mi>[0-9]{2})(?P<s>[0-9]{2})\.json$",
    )
    .expect("response filename regex is valid")
});

/// Generated HTML comparison report; minute precision.
static REPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^comparison-report-(?P<slug>.*?)-(?P<y>[0-9]{4})-(?P<mo>[0-9]{2})-(?P<d>[0-9]{2})-(?P<h>[0-9]{2})(?P<mi>[0-9]{2})\.html$",
    )
    .expect("report filename regex is valid")
});

/// Device strategy encoded in an artifact filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Desktop,
    Mobile,
    /// Sentinel for aggregate HTML comparison reports.
    Report,
}

impl Strategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Report => "report",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "desktop" => Some(Self::Desktop),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields decoded from a recognised artifact filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub slug: String,
    pub strategy: Strategy,
    pub timestamp: NaiveDateTime,
}

/// Classify a bare filename.
///
/// Returns `None` for anything that is not an artifact, including names whose
/// timestamp has the right shape but is not a real calendar date or time, and
/// names with an empty slug.
#[must_use]
pub fn classify(filename: &str) -> Option<Artifact> {
    if let Some(caps) = RESPONSE_RE.captures(filename) {
        let strategy = Strategy::from_token(&caps["strategy"])?;
        return build(&caps, strategy, true);
    }

    if let Some(caps) = REPORT_RE.captures(filename) {
        return build(&caps, Strategy::Report, false);
    }

    None
}

fn build(caps: &Captures<'_>, strategy: Strategy, has_seconds: bool) -> Option<Artifact> {
    let slug = &caps["slug"];
    if slug.is_empty() {
        return None;
    }

    let field = |name: &str| caps[name].parse::<u32>().ok();
    let year = i32::try_from(field("y")?).ok()?;
    let second = if has_seconds { field("s")? } else { 0 };

    let timestamp = NaiveDate::from_ymd_opt(year, field("mo")?, field("d")?)?
        .and_hms_opt(field("h")?, field("mi")?, second)?;

    Some(Artifact {
        slug: slug.to_string(),
        strategy,
        timestamp,
    })
}

/// Render the grammar-1 filename for a raw API response.
#[must_use]
pub fn response_filename(slug: &str, strategy: &str, stamp: &str) -> String {
    format!("{slug}-{strategy}-{stamp}.json")
}
