//! Pool health status as reported by `zpool status`

use crate::size::parse_size;
use chrono::{DateTime, Utc};
use std::fmt;

/// Pool state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolState {
    Online,
    Degraded,
    Faulted,
    Offline,
    Unavail,
    Removed,
    Suspended,
    /// Anything zpool reports that we don't recognize
    Unknown(String),
}

impl PoolState {
    /// Parse a zpool state label (case-insensitive)
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "ONLINE" => PoolState::Online,
            "DEGRADED" => PoolState::Degraded,
            "FAULTED" => PoolState::Faulted,
            "OFFLINE" => PoolState::Offline,
            "UNAVAIL" => PoolState::Unavail,
            "REMOVED" => PoolState::Removed,
            "SUSPENDED" => PoolState::Suspended,
            _ => PoolState::Unknown(label.to_string()),
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, PoolState::Online)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PoolState::Online => "ONLINE",
            PoolState::Degraded => "DEGRADED",
            PoolState::Faulted => "FAULTED",
            PoolState::Offline => "OFFLINE",
            PoolState::Unavail => "UNAVAIL",
            PoolState::Removed => "REMOVED",
            PoolState::Suspended => "SUSPENDED",
            PoolState::Unknown(raw) => raw.as_str(),
        };
        f.write_str(label)
    }
}

/// Kind of the last scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFunction {
    Scrub,
    Resilver,
    Unknown(String),
}

impl ScanFunction {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "scrub" => ScanFunction::Scrub,
            "resilver" => ScanFunction::Resilver,
            other => ScanFunction::Unknown(other.to_string()),
        }
    }
}

/// Progress of the last scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    Finished,
    InProgress,
    Canceled,
    /// No scan has ever run
    None,
    Unknown(String),
}

impl ScanState {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "finished" => ScanState::Finished,
            "in_progress" | "scanning" => ScanState::InProgress,
            "canceled" => ScanState::Canceled,
            "none" | "" => ScanState::None,
            other => ScanState::Unknown(other.to_string()),
        }
    }
}

/// Last scrub/resilver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInfo {
    pub function: ScanFunction,
    pub state: ScanState,
    /// End time of the scan, or its start time while still running
    pub last_time: Option<DateTime<Utc>>,
}

/// Health of one pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub name: String,
    pub state: PoolState,
    pub status: Option<String>,
    pub action: Option<String>,
    /// Pool-level data error count
    pub error_count: u64,
    /// Root vdev counters
    pub read_errors: u64,
    pub write_errors: u64,
    pub checksum_errors: u64,
    pub alloc_space: Option<String>,
    pub total_space: Option<String>,
    /// None when zpool reported no scan at all
    pub scan: Option<ScanInfo>,
}

impl HealthStatus {
    /// A healthy ONLINE pool with clean counters
    pub fn online(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: PoolState::Online,
            status: None,
            action: None,
            error_count: 0,
            read_errors: 0,
            write_errors: 0,
            checksum_errors: 0,
            alloc_space: None,
            total_space: None,
            scan: None,
        }
    }

    /// True if any vdev error counter is nonzero
    pub fn has_vdev_errors(&self) -> bool {
        self.read_errors > 0 || self.write_errors > 0 || self.checksum_errors > 0
    }

    /// ONLINE with no data errors and clean vdev counters
    pub fn is_healthy(&self) -> bool {
        self.state.is_online() && self.error_count == 0 && !self.has_vdev_errors()
    }
}

/// Parse an error counter (`"0"`, `""`, or abbreviated like `"1.50K"`)
pub fn parse_count(raw: &str) -> u64 {
    parse_size(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_state_parse() {
        assert_eq!(PoolState::parse("ONLINE"), PoolState::Online);
        assert_eq!(PoolState::parse("online"), PoolState::Online);
        assert_eq!(PoolState::parse("DEGRADED"), PoolState::Degraded);
        assert_eq!(PoolState::parse("FAULTED"), PoolState::Faulted);
        assert_eq!(PoolState::parse("WEIRD"), PoolState::Unknown("WEIRD".to_string()));
        assert_eq!(PoolState::parse("WEIRD").to_string(), "WEIRD");
    }

    #[test]
    fn test_scan_labels() {
        assert_eq!(ScanFunction::parse("SCRUB"), ScanFunction::Scrub);
        assert_eq!(ScanFunction::parse("resilver"), ScanFunction::Resilver);
        assert_eq!(ScanState::parse("FINISHED"), ScanState::Finished);
        assert_eq!(ScanState::parse("in_progress"), ScanState::InProgress);
        assert_eq!(ScanState::parse("none"), ScanState::None);
    }

    #[test]
    fn test_is_healthy() {
        let mut status = HealthStatus::online("tank");
        assert!(status.is_healthy());

        status.checksum_errors = 3;
        assert!(!status.is_healthy());

        let mut degraded = HealthStatus::online("tank");
        degraded.state = PoolState::Degraded;
        assert!(!degraded.is_healthy());

        let mut data_errors = HealthStatus::online("tank");
        data_errors.error_count = 1;
        assert!(!data_errors.is_healthy());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("0"), 0);
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count("1.5K"), 1536);
    }
}
