//! Command lines per operation mode

use crate::error::ZfsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// How the storage tools are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Read canned JSON from a fixture directory; mutations are no-ops
    Test,
    /// `zfs`/`zpool` from `$PATH`
    #[default]
    Direct,
    /// Host binaries through `chroot`, for containerized deployments
    Chroot,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "test",
            Mode::Direct => "direct",
            Mode::Chroot => "chroot",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ZfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Mode::Test),
            "direct" => Ok(Mode::Direct),
            "chroot" => Ok(Mode::Chroot),
            _ => Err(ZfsError::InvalidMode(s.to_string())),
        }
    }
}

/// Paths the mode-specific command sets depend on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSettings {
    /// Host root for chroot mode (default: /host)
    pub chroot_host_path: String,
    /// Directory of zfs/zpool inside the chroot (default: /usr/local/sbin)
    pub chroot_bin_path: String,
    /// Fixture directory for test mode (default: test)
    pub fixture_dir: PathBuf,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            chroot_host_path: "/host".to_string(),
            chroot_bin_path: "/usr/local/sbin".to_string(),
            fixture_dir: PathBuf::from("test"),
        }
    }
}

/// Fixture file names read in test mode
pub const FIXTURE_POOLS: &str = "zfs_list_pools.json";
pub const FIXTURE_SNAPSHOTS: &str = "zfs_list_snapshots.json";
pub const FIXTURE_POOL_STATUS: &str = "zpool_status.json";
pub const FIXTURE_VERSION: &str = "zfs_version.json";

/// Argument vectors for every backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    pub list_volumes: Vec<String>,
    pub list_snapshots: Vec<String>,
    pub create_snapshot: Vec<String>,
    pub destroy_snapshot: Vec<String>,
    pub pool_status: Vec<String>,
    pub version: Vec<String>,
    /// Append `dataset@name` to create/destroy (false in test mode)
    pub append_target: bool,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn with_args(base: &[String], args: &[&str]) -> Vec<String> {
    let mut v = base.to_vec();
    v.extend(args.iter().map(|s| s.to_string()));
    v
}

impl CommandSet {
    pub fn for_mode(mode: Mode, settings: &ModeSettings) -> Self {
        match mode {
            Mode::Direct => Self::with_binaries(&argv(&["zfs"]), &argv(&["zpool"])),
            Mode::Chroot => {
                let bin = settings.chroot_bin_path.trim_end_matches('/');
                let zfs = vec![
                    "chroot".to_string(),
                    settings.chroot_host_path.clone(),
                    format!("{}/zfs", bin),
                ];
                let zpool = vec![
                    "chroot".to_string(),
                    settings.chroot_host_path.clone(),
                    format!("{}/zpool", bin),
                ];
                Self::with_binaries(&zfs, &zpool)
            }
            Mode::Test => {
                let fixture = |name: &str| {
                    vec![
                        "cat".to_string(),
                        settings.fixture_dir.join(name).to_string_lossy().into_owned(),
                    ]
                };
                Self {
                    list_volumes: fixture(FIXTURE_POOLS),
                    list_snapshots: fixture(FIXTURE_SNAPSHOTS),
                    create_snapshot: argv(&["true"]),
                    destroy_snapshot: argv(&["true"]),
                    pool_status: fixture(FIXTURE_POOL_STATUS),
                    version: fixture(FIXTURE_VERSION),
                    append_target: false,
                }
            }
        }
    }

    fn with_binaries(zfs: &[String], zpool: &[String]) -> Self {
        Self {
            list_volumes: with_args(zfs, &["list", "-j"]),
            list_snapshots: with_args(zfs, &["list", "-j", "-t", "snapshot"]),
            create_snapshot: with_args(zfs, &["snapshot"]),
            destroy_snapshot: with_args(zfs, &["destroy"]),
            pool_status: with_args(zpool, &["status", "-j"]),
            version: with_args(zfs, &["version", "-j"]),
            append_target: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("test".parse::<Mode>().unwrap(), Mode::Test);
        assert_eq!("Direct".parse::<Mode>().unwrap(), Mode::Direct);
        assert_eq!("chroot".parse::<Mode>().unwrap(), Mode::Chroot);
        assert!("kubernetes".parse::<Mode>().is_err());
        assert_eq!(Mode::default(), Mode::Direct);
    }

    #[test]
    fn test_direct_commands() {
        let set = CommandSet::for_mode(Mode::Direct, &ModeSettings::default());
        assert_eq!(set.list_volumes, vec!["zfs", "list", "-j"]);
        assert_eq!(set.list_snapshots, vec!["zfs", "list", "-j", "-t", "snapshot"]);
        assert_eq!(set.create_snapshot, vec!["zfs", "snapshot"]);
        assert_eq!(set.destroy_snapshot, vec!["zfs", "destroy"]);
        assert_eq!(set.pool_status, vec!["zpool", "status", "-j"]);
        assert_eq!(set.version, vec!["zfs", "version", "-j"]);
        assert!(set.append_target);
    }

    #[test]
    fn test_chroot_commands() {
        let set = CommandSet::for_mode(Mode::Chroot, &ModeSettings::default());
        assert_eq!(set.list_volumes, vec!["chroot", "/host", "/usr/local/sbin/zfs", "list", "-j"]);
        assert_eq!(set.pool_status, vec!["chroot", "/host", "/usr/local/sbin/zpool", "status", "-j"]);
    }

    #[test]
    fn test_fixture_commands() {
        let settings = ModeSettings {
            fixture_dir: PathBuf::from("/tmp/fixtures"),
            ..Default::default()
        };
        let set = CommandSet::for_mode(Mode::Test, &settings);
        assert_eq!(set.list_volumes, vec!["cat", "/tmp/fixtures/zfs_list_pools.json"]);
        assert_eq!(set.create_snapshot, vec!["true"]);
        assert!(!set.append_target);
    }
}
