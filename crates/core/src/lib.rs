//! Autosnap core - snapshot data model
//!
//! This crate provides:
//! - Retention frequencies and time-period keys
//! - Snapshot naming, parsing and filtering
//! - Volume descriptors and pool health status
//! - Human-readable size parsing

pub mod frequency;
pub mod health;
pub mod period;
pub mod size;
pub mod snapshot;
pub mod volume;

// Re-export main types for convenience
pub use frequency::{Frequency, ParseFrequencyError};
pub use health::{HealthStatus, PoolState, ScanFunction, ScanInfo, ScanState};
pub use period::{period_key, period_key_for_label};
pub use size::{parse_size, usage_percent};
pub use snapshot::{Snapshot, SnapshotFilter, SNAPSHOT_TIME_FORMAT};
pub use volume::{VersionInfo, VolumeDescriptor};
