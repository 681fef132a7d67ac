//! Tiered age-based retention.
//!
//! After daily dedup every candidate lands in one of three tiers by age:
//!
//! | tier    | age                                    | survivors                         |
//! |---------|----------------------------------------|-----------------------------------|
//! | full    | `age < recent_days`                    | all                               |
//! | weekly  | `recent_days <= age < weekly_cutoff`   | most recent per ISO week bucket   |
//! | monthly | `age >= weekly_cutoff`                 | most recent per calendar month    |
//!
//! Buckets are shared by every artifact unless [`BucketScope::PerSeries`] is
//! selected, in which case each `(slug, strategy)` series gets its own.

use crate::artifact::Strategy;
use crate::dedup::{latest_per_day, recency_order};
use crate::error::{PagekeepError, Result};
use crate::scan::{Entry, Inventory};
use chrono::{Datelike, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::debug;

/// How weekly and monthly buckets are keyed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BucketScope {
    /// One bucket per period across all slugs and strategies.
    #[default]
    Global,
    /// One bucket per period per `(slug, strategy)`.
    PerSeries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Full,
    Weekly,
    Monthly,
}

/// Why a file survived selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepReason {
    Recent,
    WeeklyRepresentative,
    MonthlyRepresentative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    recent_days: u32,
    weekly_cutoff_days: u32,
    bucket_scope: BucketScope,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            recent_days: 90,
            weekly_cutoff_days: 365,
            bucket_scope: BucketScope::Global,
        }
    }
}

impl RetentionPolicy {
    /// # Errors
    ///
    /// Returns [`PagekeepError::InvalidRetentionWindow`] if
    /// `recent_days > weekly_cutoff_days`.
    pub fn new(
        recent_days: u32,
        weekly_cutoff_days: u32,
        bucket_scope: BucketScope,
    ) -> Result<Self> {
        if recent_days > weekly_cutoff_days {
            return Err(PagekeepError::InvalidRetentionWindow {
                recent_days,
                weekly_cutoff_days,
            });
        }
        Ok(Self {
            recent_days,
            weekly_cutoff_days,
            bucket_scope,
        })
    }

    #[must_use]
    pub const fn recent_days(&self) -> u32 {
        self.recent_days
    }

    #[must_use]
    pub const fn weekly_cutoff_days(&self) -> u32 {
        self.weekly_cutoff_days
    }

    #[must_use]
    pub const fn bucket_scope(&self) -> BucketScope {
        self.bucket_scope
    }

    /// Tier for a file timestamped `timestamp`, evaluated at `now`.
    #[must_use]
    pub fn tier(&self, timestamp: NaiveDateTime, now: NaiveDateTime) -> Tier {
        let age = now - timestamp;
        if age < TimeDelta::days(i64::from(self.recent_days)) {
            Tier::Full
        } else if age < TimeDelta::days(i64::from(self.weekly_cutoff_days)) {
            Tier::Weekly
        } else {
            Tier::Monthly
        }
    }

    fn bucket(&self, entry: &Entry, period: Period) -> Bucket {
        let series = match self.bucket_scope {
            BucketScope::Global => None,
            BucketScope::PerSeries => Some((entry.artifact.slug.clone(), entry.artifact.strategy)),
        };
        Bucket { series, period }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Period {
    IsoWeek { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl Period {
    fn iso_week(ts: NaiveDateTime) -> Self {
        let week = ts.iso_week();
        Self::IsoWeek {
            year: week.year(),
            week: week.week(),
        }
    }

    fn month(ts: NaiveDateTime) -> Self {
        Self::Month {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Bucket {
    series: Option<(String, Strategy)>,
    period: Period,
}

/// The outcome of retention selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: BTreeMap<PathBuf, KeepReason>,
    pub prune: BTreeSet<PathBuf>,
}

impl RetentionPlan {
    #[must_use]
    pub fn keeps(&self, path: &std::path::Path) -> bool {
        self.keep.contains_key(path)
    }
}

/// Choose the keep-set among deduplicated `candidates`.
#[must_use]
pub fn select_keep_set(
    candidates: &[Entry],
    now: NaiveDateTime,
    policy: &RetentionPolicy,
) -> BTreeMap<PathBuf, KeepReason> {
    let mut keep = BTreeMap::new();
    let mut representatives: BTreeMap<Bucket, &Entry> = BTreeMap::new();

    for entry in candidates {
        let period = match policy.tier(entry.timestamp(), now) {
            Tier::Full => {
                keep.insert(entry.path.clone(), KeepReason::Recent);
                continue;
            }
            Tier::Weekly => Period::iso_week(entry.timestamp()),
            Tier::Monthly => Period::month(entry.timestamp()),
        };

        representatives
            .entry(policy.bucket(entry, period))
            .and_modify(|current| {
                if recency_order(entry, *current).is_gt() {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    for (bucket, entry) in representatives {
        let reason = match bucket.period {
            Period::IsoWeek { .. } => KeepReason::WeeklyRepresentative,
            Period::Month { .. } => KeepReason::MonthlyRepresentative,
        };
        keep.insert(entry.path.clone(), reason);
    }

    keep
}

/// Full pipeline over a scanned inventory: daily dedup, then tiered selection.
#[must_use]
pub fn plan_retention(
    inventory: &Inventory,
    now: NaiveDateTime,
    policy: &RetentionPolicy,
) -> RetentionPlan {
    let candidates = latest_per_day(&inventory.groups);
    let keep = select_keep_set(&candidates, now, policy);

    for (path, reason) in &keep {
        debug!(path = %path.display(), ?reason, "keeping");
    }

    let prune = inventory
        .artifacts
        .iter()
        .filter(|path| !keep.contains_key(*path))
        .cloned()
        .collect();

    RetentionPlan { keep, prune }
}
