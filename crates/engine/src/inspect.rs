//! Read-only inspection: health verdicts, scrub age, snapshot summaries
//!
//! Shared by the coordinator's reporting step and the `status` command.

use autosnap_core::{Frequency, HealthStatus, PoolState, ScanState, Snapshot};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;

/// Whether a pool may be mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    /// zpool reported nothing for the pool
    Missing,
    NotOnline(PoolState),
    Errors {
        data: u64,
        read: u64,
        write: u64,
        checksum: u64,
    },
}

impl HealthVerdict {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthVerdict::Healthy)
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthVerdict::Healthy => write!(f, "healthy"),
            HealthVerdict::Missing => write!(f, "no status reported"),
            HealthVerdict::NotOnline(state) => write!(f, "state {}", state),
            HealthVerdict::Errors { data, read, write, checksum } => write!(
                f,
                "errors (data {}, read {}, write {}, checksum {})",
                data, read, write, checksum
            ),
        }
    }
}

/// Health gate for `pool`
pub fn assess_health(pool: &str, statuses: &HashMap<String, HealthStatus>) -> HealthVerdict {
    let Some(status) = statuses.get(pool) else {
        return HealthVerdict::Missing;
    };
    if !status.state.is_online() {
        return HealthVerdict::NotOnline(status.state.clone());
    }
    if status.error_count > 0 || status.has_vdev_errors() {
        return HealthVerdict::Errors {
            data: status.error_count,
            read: status.read_errors,
            write: status.write_errors,
            checksum: status.checksum_errors,
        };
    }
    HealthVerdict::Healthy
}

/// Age of the last scrub relative to the configured threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrubAge {
    NoInformation,
    Overdue { last: DateTime<Utc>, age: Duration },
    InProgress { started: DateTime<Utc> },
    Recent { last: DateTime<Utc>, age: Duration },
}

impl ScrubAge {
    pub fn needs_attention(&self) -> bool {
        matches!(self, ScrubAge::NoInformation | ScrubAge::Overdue { .. })
    }
}

impl fmt::Display for ScrubAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrubAge::NoInformation => write!(f, "no scrub information"),
            ScrubAge::Overdue { last, age } => write!(
                f,
                "last scrub {} days ago ({})",
                age.num_days(),
                last.format("%Y-%m-%d %H:%M:%S")
            ),
            ScrubAge::InProgress { started } => {
                write!(f, "scrub in progress (started {})", started.format("%Y-%m-%d %H:%M:%S"))
            }
            ScrubAge::Recent { last, age } if age.num_days() == 0 => write!(
                f,
                "last scrub {} hour(s) ago ({})",
                age.num_hours(),
                last.format("%Y-%m-%d %H:%M:%S")
            ),
            ScrubAge::Recent { last, age } => write!(
                f,
                "last scrub {} day(s) ago ({})",
                age.num_days(),
                last.format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

/// Classify the scrub age of a pool
///
/// Overdue wins over in-progress: a scrub started long ago and still
/// running is reported as overdue.
pub fn scrub_age(status: &HealthStatus, now: DateTime<Utc>, threshold: Duration) -> ScrubAge {
    let Some(scan) = &status.scan else {
        return ScrubAge::NoInformation;
    };
    let Some(last) = scan.last_time else {
        return ScrubAge::NoInformation;
    };
    if scan.state == ScanState::None {
        return ScrubAge::NoInformation;
    }

    let age = now - last;
    if age > threshold {
        ScrubAge::Overdue { last, age }
    } else if scan.state == ScanState::InProgress {
        ScrubAge::InProgress { started: last }
    } else {
        ScrubAge::Recent { last, age }
    }
}

/// Count and range of managed snapshots for one frequency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub frequency: Frequency,
    pub count: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Per-frequency summaries, in `frequencies` order
pub fn summarize(snapshots: &[Snapshot], frequencies: &[Frequency]) -> Vec<SnapshotSummary> {
    frequencies
        .iter()
        .map(|&frequency| {
            let times: Vec<_> = snapshots
                .iter()
                .filter_map(|s| s.managed_time(frequency))
                .collect();
            SnapshotSummary {
                frequency,
                count: times.len(),
                oldest: times.iter().min().copied(),
                newest: times.iter().max().copied(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autosnap_core::{ScanFunction, ScanInfo};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn with_scan(state: ScanState, last: Option<DateTime<Utc>>) -> HealthStatus {
        let mut status = HealthStatus::online("tank");
        status.scan = Some(ScanInfo { function: ScanFunction::Scrub, state, last_time: last });
        status
    }

    #[test]
    fn test_assess_health() {
        let mut statuses = HashMap::new();
        assert_eq!(assess_health("tank", &statuses), HealthVerdict::Missing);

        statuses.insert("tank".to_string(), HealthStatus::online("tank"));
        assert!(assess_health("tank", &statuses).is_healthy());

        let mut degraded = HealthStatus::online("tank");
        degraded.state = PoolState::Degraded;
        statuses.insert("tank".to_string(), degraded);
        assert_eq!(
            assess_health("tank", &statuses),
            HealthVerdict::NotOnline(PoolState::Degraded)
        );

        let mut errors = HealthStatus::online("tank");
        errors.read_errors = 2;
        statuses.insert("tank".to_string(), errors);
        let verdict = assess_health("tank", &statuses);
        assert!(!verdict.is_healthy());
        assert_eq!(verdict.to_string(), "errors (data 0, read 2, write 0, checksum 0)");
    }

    #[test]
    fn test_scrub_age() {
        let threshold = Duration::days(90);

        assert_eq!(scrub_age(&HealthStatus::online("tank"), now(), threshold), ScrubAge::NoInformation);
        assert_eq!(
            scrub_age(&with_scan(ScanState::None, Some(now())), now(), threshold),
            ScrubAge::NoInformation
        );

        let old = now() - Duration::days(120);
        assert!(matches!(
            scrub_age(&with_scan(ScanState::Finished, Some(old)), now(), threshold),
            ScrubAge::Overdue { .. }
        ));
        assert!(matches!(
            scrub_age(&with_scan(ScanState::InProgress, Some(old)), now(), threshold),
            ScrubAge::Overdue { .. }
        ));

        let recent = now() - Duration::hours(5);
        assert_eq!(
            scrub_age(&with_scan(ScanState::InProgress, Some(recent)), now(), threshold),
            ScrubAge::InProgress { started: recent }
        );
        let age = scrub_age(&with_scan(ScanState::Finished, Some(recent)), now(), threshold);
        assert!(!age.needs_attention());
        assert!(age.to_string().starts_with("last scrub 5 hour(s) ago"));
    }

    #[test]
    fn test_summarize() {
        let snapshots = vec![
            Snapshot::from_name("tank", "tank/data", "autosnap_2024-05-01_00:00:00_daily", "autosnap"),
            Snapshot::from_name("tank", "tank/data", "autosnap_2024-05-03_00:00:00_daily", "autosnap"),
            Snapshot::from_name("tank", "tank/data", "manual", "autosnap"),
        ];
        let summary = summarize(&snapshots, &[Frequency::Hourly, Frequency::Daily]);
        assert_eq!(summary[0].count, 0);
        assert_eq!(summary[0].oldest, None);
        assert_eq!(summary[1].count, 2);
        assert_eq!(summary[1].oldest, Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        assert_eq!(summary[1].newest, Some(Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()));
    }
}
