//! Daily "latest wins" deduplication.

use crate::scan::{Entry, RetentionKey};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Total order used wherever one entry must win over another.
///
/// Later timestamp wins; on an exact tie the lexicographically greatest path
/// wins, so the outcome never depends on scan order.
#[must_use]
pub fn recency_order(a: &Entry, b: &Entry) -> Ordering {
    a.timestamp()
        .cmp(&b.timestamp())
        .then_with(|| a.path.cmp(&b.path))
}

/// Pick the single most recent entry for every retention key.
#[must_use]
pub fn latest_per_day(groups: &BTreeMap<RetentionKey, Vec<Entry>>) -> Vec<Entry> {
    groups
        .values()
        .filter_map(|entries| entries.iter().max_by(|a, b| recency_order(a, b)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::classify;
    use crate::scan::Inventory;
    use std::path::PathBuf;

    fn inventory_of(paths: &[&str]) -> Inventory {
        let mut inventory = Inventory::default();
        for path in paths {
            let path = PathBuf::from(path);
            let name = path.file_name().unwrap().to_str().unwrap();
            let artifact = classify(name).unwrap();
            inventory.insert(path.clone(), artifact);
        }
        inventory
    }

    #[test]
    fn latest_timestamp_wins_regardless_of_order() {
        let t1 = "d/site-desktop-2024-01-15-080000.json";
        let t2 = "d/site-desktop-2024-01-15-120000.json";
        let t3 = "d/site-desktop-2024-01-15-235959.json";

        for order in [[t1, t2, t3], [t3, t2, t1], [t2, t3, t1], [t3, t1, t2]] {
            let inventory = inventory_of(&order);
            let winners = latest_per_day(&inventory.groups);
            assert_eq!(winners.len(), 1);
            assert_eq!(winners[0].path, PathBuf::from(t3));
        }
    }

    #[test]
    fn strategies_and_days_are_separate_keys() {
        let inventory = inventory_of(&[
            "site-desktop-2024-01-15-080000.json",
            "site-mobile-2024-01-15-080000.json",
            "site-desktop-2024-01-16-080000.json",
            "other-desktop-2024-01-15-080000.json",
            "comparison-report-site-2024-01-15-0800.html",
        ]);
        assert_eq!(latest_per_day(&inventory.groups).len(), 5);
    }

    #[test]
    fn exact_tie_prefers_greatest_path() {
        let inventory = inventory_of(&[
            "b/site-desktop-2024-01-15-080000.json",
            "a/site-desktop-2024-01-15-080000.json",
        ]);
        let winners = latest_per_day(&inventory.groups);
        assert_eq!(winners.len(), 1);
        assert_eq!(
            winners[0].path,
            PathBuf::from("b/site-desktop-2024-01-15-080000.json")
        );
    }
}
