//! Per-run engine options

use chrono::Duration;

/// Knobs the coordinator and sequencer read during a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Simulate creates and deletes
    pub dry_run: bool,
    /// Deletions allowed across the whole run (default: 100)
    pub max_deletions_per_run: usize,
    /// Name prefix of managed snapshots (default: autosnap)
    pub snapshot_prefix: String,
    /// Pools to manage; empty means all
    pub pool_whitelist: Vec<String>,
    /// Filesystems to manage; empty means all
    pub filesystem_whitelist: Vec<String>,
    /// Scrub age above which a pool is reported overdue (default: 90 days)
    pub scrub_age_threshold: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_deletions_per_run: 100,
            snapshot_prefix: "autosnap".to_string(),
            pool_whitelist: Vec::new(),
            filesystem_whitelist: Vec::new(),
            scrub_age_threshold: Duration::days(90),
        }
    }
}

impl RunOptions {
    pub fn is_pool_allowed(&self, pool: &str) -> bool {
        self.pool_whitelist.is_empty() || self.pool_whitelist.iter().any(|p| p == pool)
    }

    pub fn is_filesystem_allowed(&self, filesystem: &str) -> bool {
        self.filesystem_whitelist.is_empty()
            || self.filesystem_whitelist.iter().any(|f| f == filesystem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_whitelists_allow_everything() {
        let options = RunOptions::default();
        assert!(options.is_pool_allowed("tank"));
        assert!(options.is_filesystem_allowed("tank/data"));
    }

    #[test]
    fn test_whitelists_are_exact() {
        let options = RunOptions {
            pool_whitelist: vec!["tank".to_string()],
            filesystem_whitelist: vec!["tank/data".to_string()],
            ..Default::default()
        };
        assert!(options.is_pool_allowed("tank"));
        assert!(!options.is_pool_allowed("tank2"));
        assert!(options.is_filesystem_allowed("tank/data"));
        assert!(!options.is_filesystem_allowed("tank/data/child"));
    }
}
