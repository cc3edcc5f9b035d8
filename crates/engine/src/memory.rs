//! In-memory backend
//!
//! No processes, no persistence. Used by the engine tests, the benchmark and
//! the CLI integration tests that don't need fixture files. Individual
//! operations can be made to fail to exercise error paths.

use crate::backend::VolumeBackend;
use crate::Result;
use anyhow::bail;
use autosnap_core::{HealthStatus, Snapshot, SnapshotFilter, VersionInfo, VolumeDescriptor};
use std::collections::{HashMap, HashSet};

/// A mutating call that reached the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create(String),
    Delete(String),
}

/// In-memory volume backend
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    version: VersionInfo,
    volumes: Vec<VolumeDescriptor>,
    snapshots: Vec<Snapshot>,
    health: HashMap<String, HealthStatus>,
    calls: Vec<BackendCall>,
    fail_version: bool,
    fail_volumes: bool,
    fail_health: bool,
    fail_listing: HashSet<String>,
    fail_create: HashSet<String>,
    fail_delete: HashSet<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            version: VersionInfo {
                userland: "zfs-memory".to_string(),
                kernel: "zfs-kmod-memory".to_string(),
            },
            ..Default::default()
        }
    }

    /// Add a healthy pool with its root descriptor
    pub fn with_pool(mut self, pool: &str) -> Self {
        self.volumes.push(VolumeDescriptor::pool_root(pool));
        self.health.insert(pool.to_string(), HealthStatus::online(pool));
        self
    }

    pub fn with_filesystem(mut self, pool: &str, filesystem: &str) -> Self {
        self.volumes.push(VolumeDescriptor::filesystem(pool, filesystem));
        self
    }

    pub fn with_volume(mut self, volume: VolumeDescriptor) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Replace the health status of `status.name`
    pub fn with_health(mut self, status: HealthStatus) -> Self {
        self.health.insert(status.name.clone(), status);
        self
    }

    pub fn without_health(mut self, pool: &str) -> Self {
        self.health.remove(pool);
        self
    }

    /// Seed existing snapshots by name, parsed with `prefix`
    pub fn with_snapshots(mut self, pool: &str, dataset: &str, prefix: &str, names: &[&str]) -> Self {
        for name in names {
            self.snapshots.push(Snapshot::from_name(pool, dataset, name, prefix));
        }
        self
    }

    pub fn failing_version(mut self) -> Self {
        self.fail_version = true;
        self
    }

    pub fn failing_volumes(mut self) -> Self {
        self.fail_volumes = true;
        self
    }

    pub fn failing_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    /// Snapshot listing fails for `dataset`
    pub fn failing_listing(mut self, dataset: &str) -> Self {
        self.fail_listing.insert(dataset.to_string());
        self
    }

    /// Every create on `dataset` fails
    pub fn failing_create(mut self, dataset: &str) -> Self {
        self.fail_create.insert(dataset.to_string());
        self
    }

    /// Deleting the snapshot with this name fails
    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete.insert(name.to_string());
        self
    }

    /// Mutating calls in the order they arrived
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn creates(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BackendCall::Create(_))).count()
    }

    pub fn deletes(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, BackendCall::Delete(_))).count()
    }

    /// Names currently stored for `dataset`, sorted
    pub fn snapshot_names(&self, dataset: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .snapshots
            .iter()
            .filter(|s| s.dataset == dataset)
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names
    }
}

impl VolumeBackend for MemoryBackend {
    fn version(&self) -> Result<VersionInfo> {
        if self.fail_version {
            bail!("version unavailable");
        }
        Ok(self.version.clone())
    }

    fn list_volumes(&self) -> Result<Vec<VolumeDescriptor>> {
        if self.fail_volumes {
            bail!("cannot list volumes");
        }
        Ok(self.volumes.clone())
    }

    fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>> {
        if let Some(dataset) = &filter.dataset {
            if self.fail_listing.contains(dataset) {
                bail!("cannot list snapshots of {}", dataset);
            }
        }
        Ok(self
            .snapshots
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn create_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.calls.push(BackendCall::Create(snapshot.path()));
        if self.fail_create.contains(&snapshot.dataset) {
            bail!("cannot create snapshot '{}': out of space", snapshot.path());
        }
        if self
            .snapshots
            .iter()
            .any(|s| s.dataset == snapshot.dataset && s.name == snapshot.name)
        {
            bail!("cannot create snapshot '{}': dataset already exists", snapshot.path());
        }
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    fn delete_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.calls.push(BackendCall::Delete(snapshot.path()));
        if self.fail_delete.contains(&snapshot.name) {
            bail!("cannot destroy '{}': dataset is busy", snapshot.path());
        }
        let before = self.snapshots.len();
        self.snapshots
            .retain(|s| !(s.dataset == snapshot.dataset && s.name == snapshot.name));
        if self.snapshots.len() == before {
            bail!("could not find any snapshots to destroy; check snapshot names");
        }
        Ok(())
    }

    fn health_status(&self) -> Result<HashMap<String, HealthStatus>> {
        if self.fail_health {
            bail!("cannot read pool status");
        }
        Ok(self.health.clone())
    }
}
