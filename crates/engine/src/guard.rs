//! Minimum-retention guard

use crate::classify::Classification;
use autosnap_core::Snapshot;

/// Keep at least one snapshot unless a successor is guaranteed
///
/// `successor_guaranteed` is true when a snapshot for the current period
/// exists or was just created. If it is false, nothing is kept and there is
/// something to delete, the newest delete candidate moves to `keep`.
/// Returns the rescued snapshot.
pub fn enforce_minimum(
    classification: &mut Classification,
    successor_guaranteed: bool,
) -> Option<Snapshot> {
    if successor_guaranteed || !classification.keep.is_empty() || classification.delete.is_empty() {
        return None;
    }

    let newest = classification
        .delete
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (a.created_at, a.name.as_str()).cmp(&(b.created_at, b.name.as_str()))
        })
        .map(|(idx, _)| idx)?;

    let rescued = classification.delete.remove(newest);
    classification.keep.push(rescued.clone());
    Some(rescued)
}
