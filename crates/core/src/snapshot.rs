//! Snapshot identity and naming
//!
//! Managed snapshots are named `<prefix>_<YYYY-MM-DD_HH:MM:SS>_<frequency>`
//! with the timestamp in UTC. Anything else on the dataset is foreign and
//! never touched.

use crate::frequency::Frequency;
use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout embedded in snapshot names
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// A point-in-time copy of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Pool the dataset lives in (e.g. `tank`)
    pub pool: String,
    /// Full dataset name including the pool (e.g. `tank/data`)
    pub dataset: String,
    /// Snapshot name after the `@`
    pub name: String,
    /// Creation time parsed from the name (None for foreign snapshots without one)
    pub created_at: Option<DateTime<Utc>>,
    /// Retention tier (None = foreign)
    pub frequency: Option<Frequency>,
}

impl Snapshot {
    /// Build the snapshot autosnap would create for `frequency` at `now`
    pub fn new_managed(
        pool: &str,
        dataset: &str,
        prefix: &str,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> Self {
        let created_at = now.trunc_subsecs(0);
        Self {
            pool: pool.to_string(),
            dataset: dataset.to_string(),
            name: format_name(prefix, frequency, created_at),
            created_at: Some(created_at),
            frequency: Some(frequency),
        }
    }

    /// Interpret an existing snapshot name
    ///
    /// The frequency is only set when the name carries `prefix`, a valid
    /// timestamp and a known frequency suffix.
    pub fn from_name(pool: &str, dataset: &str, name: &str, prefix: &str) -> Self {
        let (created_at, frequency) = match parse_name(name, prefix) {
            Some((ts, freq)) => (Some(ts), Some(freq)),
            None => (None, None),
        };
        Self {
            pool: pool.to_string(),
            dataset: dataset.to_string(),
            name: name.to_string(),
            created_at,
            frequency,
        }
    }

    /// Full ZFS path (`dataset@name`)
    pub fn path(&self) -> String {
        format!("{}@{}", self.dataset, self.name)
    }

    /// True if autosnap owns this snapshot
    pub fn is_managed(&self) -> bool {
        self.frequency.is_some() && self.created_at.is_some()
    }

    /// Creation time if the snapshot is managed under `frequency`
    pub fn managed_time(&self, frequency: Frequency) -> Option<DateTime<Utc>> {
        match self.frequency {
            Some(f) if f == frequency => self.created_at,
            _ => None,
        }
    }
}

/// Format a managed snapshot name
pub fn format_name(prefix: &str, frequency: Frequency, ts: DateTime<Utc>) -> String {
    format!("{}_{}_{}", prefix, ts.format(SNAPSHOT_TIME_FORMAT), frequency)
}

/// Parse a managed snapshot name into its timestamp and frequency
pub fn parse_name(name: &str, prefix: &str) -> Option<(DateTime<Utc>, Frequency)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('_')?;
    let (stamp, label) = rest.rsplit_once('_')?;
    let frequency = label.parse::<Frequency>().ok()?;
    let naive = NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIME_FORMAT).ok()?;
    Some((Utc.from_utc_datetime(&naive), frequency))
}

/// Selects snapshots by pool, dataset and frequency
///
/// Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    pub pool: Option<String>,
    pub dataset: Option<String>,
    pub frequency: Option<Frequency>,
}

impl SnapshotFilter {
    /// Filter matching every snapshot
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter for one dataset
    pub fn for_dataset(pool: &str, dataset: &str) -> Self {
        Self {
            pool: Some(pool.to_string()),
            dataset: Some(dataset.to_string()),
            frequency: None,
        }
    }

    /// Narrow the filter to one frequency
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn matches(&self, snapshot: &Snapshot) -> bool {
        if let Some(pool) = &self.pool {
            if &snapshot.pool != pool {
                return false;
            }
        }
        if let Some(dataset) = &self.dataset {
            if &snapshot.dataset != dataset {
                return false;
            }
        }
        if let Some(frequency) = self.frequency {
            if snapshot.frequency != Some(frequency) {
                return false;
            }
        }
        true
    }
}
