//! Recursive directory scan producing the artifact inventory.

use crate::artifact::{Artifact, Strategy, classify};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, btree_map};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Granularity of daily "latest wins" dedup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetentionKey {
    pub slug: String,
    pub strategy: Strategy,
    pub date: NaiveDate,
}

impl RetentionKey {
    #[must_use]
    pub fn of(artifact: &Artifact) -> Self {
        Self {
            slug: artifact.slug.clone(),
            strategy: artifact.strategy,
            date: artifact.timestamp.date(),
        }
    }
}

/// One recognised artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub artifact: Artifact,
}

impl Entry {
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.artifact.timestamp
    }
}

/// Everything a scan found.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Every recognised artifact path.
    pub artifacts: BTreeSet<PathBuf>,
    /// Artifacts grouped by retention key.
    pub groups: BTreeMap<RetentionKey, Vec<Entry>>,
    /// Regular files that did not match either grammar.
    pub skipped: usize,
}

impl Inventory {
    pub fn insert(&mut self, path: PathBuf, artifact: Artifact) {
        self.artifacts.insert(path.clone());
        self.groups
            .entry(RetentionKey::of(&artifact))
            .or_default()
            .push(Entry { path, artifact });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Walk `root` (following symlinks, no depth limit) and classify every file.
///
/// A file reachable under several paths through symlinked directories is
/// inventoried once, preferring the path that involves no symlink, so pruning
/// one alias can never remove the copy another alias kept. Walk errors are
/// logged and skipped; the scan itself never fails.
#[must_use]
pub fn scan_directory(root: &Path) -> Inventory {
    let mut inventory = Inventory::default();

    for path in unique_files(root).into_values() {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            debug!(path = %path.display(), "skipping non-UTF-8 filename");
            inventory.skipped += 1;
            continue;
        };

        match classify(name) {
            Some(artifact) => inventory.insert(path, artifact),
            None => {
                debug!(file = name, "skipping non-matching file");
                inventory.skipped += 1;
            }
        }
    }

    inventory
}

/// Regular files under `root`, one walk path per physical file, keyed by
/// canonical path.
fn unique_files(root: &Path) -> BTreeMap<PathBuf, PathBuf> {
    let canonical_root = fs::canonicalize(root).ok();
    // (reached through a symlink, depth, walk path); the smallest wins.
    let mut seen: BTreeMap<PathBuf, (bool, usize, PathBuf)> = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during scan");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let canonical = match fs::canonicalize(entry.path()) {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "skipping unresolvable file");
                continue;
            }
        };
        let direct = canonical_root
            .as_deref()
            .zip(entry.path().strip_prefix(root).ok())
            .is_some_and(|(base, rel)| base.join(rel) == canonical);
        let rank = (!direct, entry.depth(), entry.into_path());

        match seen.entry(canonical) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(rank);
            }
            btree_map::Entry::Occupied(mut slot) => {
                let alias = if rank < *slot.get() {
                    slot.insert(rank)
                } else {
                    rank
                };
                debug!(path = %alias.2.display(), "skipping alias of an already scanned file");
            }
        }
    }

    seen.into_iter()
        .map(|(canonical, (_, _, path))| (canonical, path))
        .collect()
}
