//! Storage backend abstraction
//!
//! The engine never talks to ZFS directly. Everything it needs from the
//! storage layer goes through this trait, which keeps the retention logic
//! testable against `MemoryBackend`.

use crate::Result;
use autosnap_core::{HealthStatus, Snapshot, SnapshotFilter, VersionInfo, VolumeDescriptor};
use std::collections::HashMap;

/// Storage operations required by the engine
///
/// All calls are blocking. Mutating calls take `&mut self`.
pub trait VolumeBackend {
    /// Userland and kernel versions of the storage tools
    fn version(&self) -> Result<VersionInfo>;

    /// Every pool root and filesystem
    fn list_volumes(&self) -> Result<Vec<VolumeDescriptor>>;

    /// Snapshots matching `filter`
    /// Unset filter fields widen the result
    fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>>;

    /// Create a snapshot; must not return until it exists
    fn create_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Destroy a snapshot
    fn delete_snapshot(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Health per pool name
    fn health_status(&self) -> Result<HashMap<String, HealthStatus>>;
}
