//! Keeper selection and keep/delete classification

use autosnap_core::{period_key, Frequency, Snapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Disjoint keep/delete split for one frequency, both oldest-first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub keep: Vec<Snapshot>,
    pub delete: Vec<Snapshot>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.delete.is_empty()
    }
}

/// Sort key: creation time, then name
fn order_key(snapshot: &Snapshot) -> (Option<DateTime<Utc>>, &str) {
    (snapshot.created_at, snapshot.name.as_str())
}

/// Latest snapshot per period key
///
/// Snapshots not managed under `frequency` are ignored. Ties on the
/// timestamp go to the lexicographically greatest name.
pub fn keepers(snapshots: &[Snapshot], frequency: Frequency) -> BTreeMap<String, &Snapshot> {
    let mut keepers: BTreeMap<String, &Snapshot> = BTreeMap::new();
    for snapshot in snapshots {
        let Some(ts) = snapshot.managed_time(frequency) else {
            continue;
        };
        let key = period_key(ts, frequency);
        match keepers.get(&key) {
            Some(current) if order_key(current) >= order_key(snapshot) => {}
            _ => {
                keepers.insert(key, snapshot);
            }
        }
    }
    keepers
}

/// Split the snapshots of one frequency into keep and delete
///
/// A period's keeper is kept iff it was created at or after `cutoff`.
/// Every non-keeper is deleted. Foreign snapshots and snapshots of other
/// frequencies appear in neither list.
pub fn classify(
    snapshots: &[Snapshot],
    frequency: Frequency,
    cutoff: DateTime<Utc>,
) -> Classification {
    let keepers = keepers(snapshots, frequency);
    let mut result = Classification::default();

    for snapshot in snapshots {
        let Some(ts) = snapshot.managed_time(frequency) else {
            continue;
        };
        let key = period_key(ts, frequency);
        let is_keeper = keepers
            .get(&key)
            .is_some_and(|keeper| keeper.name == snapshot.name && keeper.dataset == snapshot.dataset);

        if is_keeper && ts >= cutoff {
            result.keep.push(snapshot.clone());
        } else {
            result.delete.push(snapshot.clone());
        }
    }

    result.keep.sort_by(|a, b| order_key(a).cmp(&order_key(b)));
    result.delete.sort_by(|a, b| order_key(a).cmp(&order_key(b)));
    result
}
