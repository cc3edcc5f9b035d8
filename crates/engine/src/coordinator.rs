//! Run coordinator
//!
//! Walks every volume the backend reports, does the read-only reporting,
//! applies the allow-lists and health gate, and runs a sequencer pass per
//! managed frequency. Only failing to read the volume list or pool health
//! stops a run; everything else is recorded and the walk continues.

use crate::backend::VolumeBackend;
use crate::inspect::{assess_health, scrub_age, summarize, ScrubAge};
use crate::options::RunOptions;
use crate::report::{RunContext, RunError, RunReport, SkipReason};
use crate::retention::RetentionPolicy;
use crate::sequencer::Sequencer;
use crate::Result;
use anyhow::Context;
use autosnap_core::{HealthStatus, SnapshotFilter, VolumeDescriptor};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Drives one run over all volumes
pub struct Coordinator<'a, B: VolumeBackend + ?Sized> {
    backend: &'a mut B,
    policy: RetentionPolicy,
    options: RunOptions,
}

impl<'a, B: VolumeBackend + ?Sized> Coordinator<'a, B> {
    pub fn new(backend: &'a mut B, policy: RetentionPolicy, options: RunOptions) -> Self {
        Self {
            backend,
            policy,
            options,
        }
    }

    /// Execute a run at `now`
    ///
    /// Returns Err only for failures that make the run meaningless (volume
    /// list or health unavailable). Per-volume problems end up in the report.
    pub fn run(&mut self, now: DateTime<Utc>) -> Result<RunReport> {
        if self.options.dry_run {
            info!("[DRY-RUN] Running in dry-run mode - no snapshots will be created or deleted");
        }

        match self.backend.version() {
            Ok(version) => info!(
                userland = %version.userland,
                kernel = %version.kernel,
                "ZFS version"
            ),
            Err(e) => warn!("Failed to get ZFS version: {:#}", e),
        }

        let health = self
            .backend
            .health_status()
            .context("Failed to read pool health status")?;
        let volumes = self
            .backend
            .list_volumes()
            .context("Failed to list pools and filesystems")?;

        self.log_configuration(now);

        let mut ctx = RunContext::new(self.options.dry_run, self.options.max_deletions_per_run, now);
        for volume in &volumes {
            self.process_volume(&mut ctx, volume, &health, now);
        }

        let report = ctx.into_report(Utc::now().max(now));
        info!(
            created = report.snapshots_created,
            deleted = report.snapshots_deleted,
            delete_failures = report.delete_failures,
            skipped_by_budget = report.skipped_by_budget,
            errors = report.errors.len(),
            "Run finished"
        );
        Ok(report)
    }

    fn log_configuration(&self, now: DateTime<Utc>) {
        info!(
            dry_run = self.options.dry_run,
            max_deletions_per_run = self.options.max_deletions_per_run,
            prefix = %self.options.snapshot_prefix,
            "Run configuration"
        );
        if self.options.pool_whitelist.is_empty() {
            info!("Pool whitelist: all pools");
        } else {
            info!("Pool whitelist: {:?}", self.options.pool_whitelist);
        }
        if self.options.filesystem_whitelist.is_empty() {
            info!("Filesystem whitelist: all filesystems");
        } else {
            info!("Filesystem whitelist: {:?}", self.options.filesystem_whitelist);
        }

        for frequency in self.policy.frequencies() {
            let count = self.policy.max_count(frequency).unwrap_or(0);
            if count == 0 {
                info!(%frequency, "Disabled - existing snapshots will be removed");
                continue;
            }
            info!(
                %frequency,
                max = count,
                cutoff = %self.policy.max_retained_date(frequency, now).format("%Y-%m-%d %H:%M:%S"),
                fresh_after = %self.policy.freshness_boundary(frequency, now).format("%Y-%m-%d %H:%M:%S"),
                "Retention"
            );
        }
    }

    fn process_volume(
        &mut self,
        ctx: &mut RunContext,
        volume: &VolumeDescriptor,
        health: &HashMap<String, HealthStatus>,
        now: DateTime<Utc>,
    ) {
        let pool = volume.pool.as_str();
        let filesystem = volume.filesystem.as_deref();

        if !self.options.is_pool_allowed(pool) {
            info!("Skipping pool {} (not in whitelist)", pool);
            ctx.skip(pool, filesystem, SkipReason::NotInPoolWhitelist);
            return;
        }

        match filesystem {
            None => self.report_pool(pool, health, now),
            Some(fs) => report_usage(fs, volume),
        }

        let verdict = assess_health(pool, health);
        if !verdict.is_healthy() {
            warn!("Skipping {} due to health issues: {}", volume.display_name(), verdict);
            ctx.record_error(RunError::UnhealthyVolume {
                pool: pool.to_string(),
                reason: verdict.to_string(),
            });
            ctx.skip(pool, filesystem, SkipReason::Unhealthy);
            return;
        }

        let Some(filesystem) = filesystem else {
            debug!("Ignoring pool root without filesystem {}", pool);
            ctx.skip(pool, None, SkipReason::PoolRoot);
            return;
        };

        if !self.options.is_filesystem_allowed(filesystem) {
            info!("Skipping filesystem {} (not in whitelist)", filesystem);
            ctx.skip(pool, Some(filesystem), SkipReason::NotInFilesystemWhitelist);
            return;
        }

        info!("Processing filesystem {}", filesystem);
        {
            let mut sequencer = Sequencer::new(&mut *self.backend, &self.policy, &self.options);
            for frequency in self.policy.frequencies() {
                sequencer.process(ctx, pool, filesystem, frequency, now);
            }
        }

        self.log_summary(pool, filesystem);
        info!("Finished filesystem {}", filesystem);
    }

    /// Pool error counters and scrub age
    fn report_pool(&self, pool: &str, health: &HashMap<String, HealthStatus>, now: DateTime<Utc>) {
        let Some(status) = health.get(pool) else {
            return;
        };

        if status.read_errors > 0 {
            warn!("Pool {} has {} read error(s)", pool, status.read_errors);
        }
        if status.write_errors > 0 {
            warn!("Pool {} has {} write error(s)", pool, status.write_errors);
        }
        if status.checksum_errors > 0 {
            warn!("Pool {} has {} checksum error(s)", pool, status.checksum_errors);
        }
        if status.has_vdev_errors() {
            warn!("Pool {} has errors - consider running 'zpool scrub {}'", pool, pool);
        }

        match scrub_age(status, now, self.options.scrub_age_threshold) {
            age @ (ScrubAge::NoInformation | ScrubAge::Overdue { .. }) => {
                warn!("Pool {}: {} - consider running 'zpool scrub {}'", pool, age, pool)
            }
            age => info!("Pool {}: {}", pool, age),
        }
    }

    fn log_summary(&self, pool: &str, filesystem: &str) {
        let snapshots = match self
            .backend
            .list_snapshots(&SnapshotFilter::for_dataset(pool, filesystem))
        {
            Ok(list) => list,
            Err(e) => {
                warn!("Failed to summarize snapshots of {}: {:#}", filesystem, e);
                return;
            }
        };

        for summary in summarize(&snapshots, &self.policy.frequencies()) {
            match (summary.oldest, summary.newest) {
                (Some(oldest), Some(newest)) => info!(
                    filesystem,
                    frequency = %summary.frequency,
                    count = summary.count,
                    oldest = %oldest.format("%Y-%m-%d %H:%M:%S"),
                    newest = %newest.format("%Y-%m-%d %H:%M:%S"),
                    "Snapshot summary"
                ),
                _ => info!(filesystem, frequency = %summary.frequency, count = 0, "Snapshot summary"),
            }
        }
    }
}

fn report_usage(filesystem: &str, volume: &VolumeDescriptor) {
    let (Some(used), Some(avail)) = (&volume.used, &volume.available) else {
        return;
    };
    match volume.usage_percent() {
        Some(pct) => info!(
            "Filesystem {} usage: {} used, {} available ({:.1}%)",
            filesystem, used, avail, pct
        ),
        None => info!("Filesystem {} usage: {} used, {} available", filesystem, used, avail),
    }
}
