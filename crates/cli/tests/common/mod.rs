//! Common utilities for integration tests

pub mod cli;

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fixture JSON shipped with the zfs crate
pub const FIXTURE_FILES: [&str; 4] = [
    "zfs_list_pools.json",
    "zfs_list_snapshots.json",
    "zpool_status.json",
    "zfs_version.json",
];

/// Temporary working directory with fixture files and a config for test mode
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let fixtures = dir.path().join("fixtures");
        fs::create_dir_all(&fixtures).expect("Failed to create fixture dir");

        let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../zfs/fixtures");
        for name in FIXTURE_FILES {
            fs::copy(source.join(name), fixtures.join(name)).expect("Failed to copy fixture");
        }

        let env = Self { dir };
        env.write_config("");
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("autosnap.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path().join("autosnap.lock")
    }

    /// Write the config file; `extra` is appended after the test-mode basics
    pub fn write_config(&self, extra: &str) {
        let contents = format!(
            "mode = \"test\"\nlock_file = \"{}\"\n{}\n[test]\nfixture_dir = \"{}\"\n",
            self.lock_path().display(),
            extra,
            self.path().join("fixtures").display()
        );
        fs::write(self.config_path(), contents).expect("Failed to write config");
    }

    /// Replace one fixture file
    pub fn write_fixture(&self, name: &str, contents: &str) {
        fs::write(self.path().join("fixtures").join(name), contents).expect("Failed to write fixture");
    }
}
