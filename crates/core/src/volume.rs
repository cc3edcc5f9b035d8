//! Pools and filesystems

use crate::size::usage_percent;
use serde::{Deserialize, Serialize};

/// A manageable storage unit
///
/// `filesystem: None` marks a pool root, which only gets health and usage
/// reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDescriptor {
    pub pool: String,
    /// Full filesystem name including the pool (e.g. `tank/data`)
    pub filesystem: Option<String>,
    pub used: Option<String>,
    pub available: Option<String>,
    pub mountpoint: Option<String>,
}

impl VolumeDescriptor {
    /// Descriptor for a pool root
    pub fn pool_root(pool: &str) -> Self {
        Self {
            pool: pool.to_string(),
            ..Default::default()
        }
    }

    /// Descriptor for a filesystem inside `pool`
    pub fn filesystem(pool: &str, filesystem: &str) -> Self {
        Self {
            pool: pool.to_string(),
            filesystem: Some(filesystem.to_string()),
            ..Default::default()
        }
    }

    pub fn is_pool_root(&self) -> bool {
        self.filesystem.is_none()
    }

    /// Filesystem name, or the pool name for a root
    pub fn display_name(&self) -> &str {
        self.filesystem.as_deref().unwrap_or(&self.pool)
    }

    /// Used share of `used + available` in percent, when both are known
    pub fn usage_percent(&self) -> Option<f64> {
        match (&self.used, &self.available) {
            (Some(used), Some(avail)) => usage_percent(used, avail),
            _ => None,
        }
    }
}

/// Userland and kernel module versions reported by the storage tools
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub userland: String,
    pub kernel: String,
}
