//! ZFS command-line backend
//!
//! This crate provides:
//! - Command sets for direct, chroot and fixture ("test") modes
//! - A blocking command runner with debug logging
//! - Decoding of the `-j` JSON output of `zfs` and `zpool`
//! - `ZfsCli`, the `VolumeBackend` used in production

pub mod commands;
pub mod error;
pub mod parser;
pub mod runner;

pub use commands::{CommandSet, Mode, ModeSettings};
pub use error::ZfsError;

use anyhow::Context;
use autosnap_core::{HealthStatus, Snapshot, SnapshotFilter, VersionInfo, VolumeDescriptor};
use autosnap_engine::{Result, VolumeBackend};
use std::collections::HashMap;
use tracing::debug;

/// Backend driving the `zfs` and `zpool` binaries
#[derive(Debug, Clone)]
pub struct ZfsCli {
    commands: CommandSet,
    prefix: String,
}

impl ZfsCli {
    /// `prefix` decides which snapshot names are managed
    pub fn new(commands: CommandSet, prefix: impl Into<String>) -> Self {
        Self {
            commands,
            prefix: prefix.into(),
        }
    }

    pub fn for_mode(mode: Mode, settings: &ModeSettings, prefix: impl Into<String>) -> Self {
        Self::new(CommandSet::for_mode(mode, settings), prefix)
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    fn mutate(&self, what: &'static str, base: &[String], snapshot: &Snapshot) -> Result<()> {
        let mut argv = base.to_vec();
        if self.commands.append_target {
            argv.push(snapshot.path());
        }
        runner::run(what, &argv).with_context(|| format!("{} {}", what, snapshot.path()))?;
        Ok(())
    }
}

impl VolumeBackend for ZfsCli {
    fn version(&self) -> Result<VersionInfo> {
        let out = runner::run("zfs version", &self.commands.version)?;
        Ok(parser::parse_version(&out)?)
    }

    fn list_volumes(&self) -> Result<Vec<VolumeDescriptor>> {
        let out = runner::run("zfs list", &self.commands.list_volumes)?;
        Ok(parser::parse_volumes(&out)?)
    }

    fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>> {
        let out = runner::run("zfs list snapshots", &self.commands.list_snapshots)?;
        let snapshots: Vec<Snapshot> = parser::parse_snapshots(&out, &self.prefix)?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();
        debug!(count = snapshots.len(), ?filter, "Listed snapshots");
        Ok(snapshots)
    }

    fn create_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.mutate("zfs snapshot", &self.commands.create_snapshot, snapshot)
    }

    fn delete_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.mutate("zfs destroy", &self.commands.destroy_snapshot, snapshot)
    }

    fn health_status(&self) -> Result<HashMap<String, HealthStatus>> {
        let out = runner::run("zpool status", &self.commands.pool_status)?;
        Ok(parser::parse_pool_status(&out)?)
    }
}
