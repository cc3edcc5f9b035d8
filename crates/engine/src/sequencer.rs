//! Create-then-delete sequencing for one (pool, dataset, frequency)
//!
//! A pass lists the snapshots of one frequency, makes sure the current
//! period is covered, and only then deletes. If the create fails the pass
//! stops before the first deletion.

use crate::backend::VolumeBackend;
use crate::classify::classify;
use crate::guard::enforce_minimum;
use crate::options::RunOptions;
use crate::report::{CreateDecision, DeleteFailure, FrequencyOutcome, PassState, RunContext, RunError};
use crate::retention::RetentionPolicy;
use autosnap_core::{period_key, Frequency, Snapshot, SnapshotFilter};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

/// Runs frequency passes against a backend
pub struct Sequencer<'a, B: VolumeBackend + ?Sized> {
    backend: &'a mut B,
    policy: &'a RetentionPolicy,
    options: &'a RunOptions,
}

impl<'a, B: VolumeBackend + ?Sized> Sequencer<'a, B> {
    pub fn new(backend: &'a mut B, policy: &'a RetentionPolicy, options: &'a RunOptions) -> Self {
        Self {
            backend,
            policy,
            options,
        }
    }

    /// Run one pass and record its outcome on `ctx`
    pub fn process(
        &mut self,
        ctx: &mut RunContext,
        pool: &str,
        dataset: &str,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> PassState {
        debug!(pool, dataset, %frequency, "Processing frequency");
        let outcome = self.run_pass(ctx, pool, dataset, frequency, now);
        let state = outcome.state;
        ctx.push_outcome(outcome);
        state
    }

    fn run_pass(
        &mut self,
        ctx: &mut RunContext,
        pool: &str,
        dataset: &str,
        frequency: Frequency,
        now: DateTime<Utc>,
    ) -> FrequencyOutcome {
        let dry_run = self.options.dry_run;
        let mut outcome = FrequencyOutcome::new(pool, dataset, frequency, dry_run);

        let filter = SnapshotFilter::for_dataset(pool, dataset).with_frequency(frequency);
        let mut snapshots: Vec<Snapshot> = match self.backend.list_snapshots(&filter) {
            Ok(list) => list
                .into_iter()
                .filter(|s| s.managed_time(frequency).is_some())
                .collect(),
            Err(e) => {
                error!(pool, dataset, %frequency, "Failed to list snapshots: {:#}", e);
                return outcome.abort(RunError::Listing {
                    pool: pool.to_string(),
                    dataset: dataset.to_string(),
                    frequency,
                    message: format!("{:#}", e),
                });
            }
        };

        if self.policy.is_disabled(frequency) {
            snapshots.sort_by(|a, b| (a.created_at, &a.name).cmp(&(b.created_at, &b.name)));
            if !snapshots.is_empty() {
                info!(
                    dataset,
                    %frequency,
                    count = snapshots.len(),
                    "Frequency disabled - removing its snapshots"
                );
            }
            self.delete_all(ctx, &mut outcome, &snapshots);
            outcome.state = PassState::Disabled;
            return outcome;
        }

        let current_key = period_key(now, frequency);
        debug!(
            dataset,
            %frequency,
            period = %current_key,
            freshness_boundary = %self.policy.freshness_boundary(frequency, now),
            "Checking for a current snapshot"
        );

        let existing = snapshots
            .iter()
            .filter(|s| {
                s.managed_time(frequency)
                    .is_some_and(|ts| period_key(ts, frequency) == current_key)
            })
            .max_by(|a, b| (a.created_at, &a.name).cmp(&(b.created_at, &b.name)));

        if let Some(existing) = existing {
            debug!(dataset, %frequency, snapshot = %existing.name, "Found recent snapshot");
            outcome.creation = CreateDecision::Covered {
                existing: existing.name.clone(),
            };
        } else {
            let snapshot = Snapshot::new_managed(
                pool,
                dataset,
                &self.options.snapshot_prefix,
                frequency,
                now,
            );
            if dry_run {
                info!("[DRY-RUN] Would create snapshot {}", snapshot.path());
                outcome.creation = CreateDecision::WouldCreate {
                    name: snapshot.name.clone(),
                };
            } else {
                match self.backend.create_snapshot(&snapshot) {
                    Ok(()) => {
                        info!("Created snapshot {}", snapshot.path());
                        outcome.creation = CreateDecision::Created {
                            name: snapshot.name.clone(),
                        };
                    }
                    Err(e) => {
                        error!(
                            "Failed to create snapshot {}: {:#} - skipping deletions",
                            snapshot.path(),
                            e
                        );
                        outcome.creation = CreateDecision::Failed {
                            name: snapshot.name.clone(),
                        };
                        return outcome.abort(RunError::Create {
                            pool: pool.to_string(),
                            dataset: dataset.to_string(),
                            frequency,
                            snapshot: snapshot.name.clone(),
                            message: format!("{:#}", e),
                        });
                    }
                }
            }
            ctx.created += 1;
            snapshots.push(snapshot);
        }

        let cutoff = self.policy.max_retained_date(frequency, now);
        let mut classification = classify(&snapshots, frequency, cutoff);
        let successor_guaranteed = classification.keep.iter().any(|s| {
            s.managed_time(frequency)
                .is_some_and(|ts| period_key(ts, frequency) == current_key)
        });

        if let Some(rescued) = enforce_minimum(&mut classification, successor_guaranteed) {
            warn!(
                dataset,
                %frequency,
                count = classification.delete.len() + 1,
                "Refusing to delete all snapshots - keeping newest snapshot {}",
                rescued.name
            );
            ctx.rescued += 1;
            outcome.rescued = Some(rescued.name);
        }

        for kept in &classification.keep {
            debug!(dataset, %frequency, "Keeping snapshot {}", kept.name);
        }
        outcome.kept = classification.keep.iter().map(|s| s.name.clone()).collect();

        self.delete_all(ctx, &mut outcome, &classification.delete);
        outcome
    }

    /// Delete candidates in order, within the run's budget
    fn delete_all(&mut self, ctx: &mut RunContext, outcome: &mut FrequencyOutcome, candidates: &[Snapshot]) {
        for snapshot in candidates {
            if !ctx.can_delete() {
                ctx.note_budget_exhausted();
                outcome.skipped_by_budget.push(snapshot.name.clone());
                continue;
            }

            if self.options.dry_run {
                info!("[DRY-RUN] Would delete snapshot {}", snapshot.path());
                ctx.deleted += 1;
                outcome.deleted.push(snapshot.name.clone());
                continue;
            }

            match self.backend.delete_snapshot(snapshot) {
                Ok(()) => {
                    info!("Deleted snapshot {}", snapshot.path());
                    ctx.deleted += 1;
                    outcome.deleted.push(snapshot.name.clone());
                }
                Err(e) => {
                    warn!("Failed to delete snapshot {}: {:#}", snapshot.path(), e);
                    ctx.delete_failures += 1;
                    outcome.delete_failures.push(DeleteFailure {
                        snapshot: snapshot.name.clone(),
                        message: format!("{:#}", e),
                    });
                }
            }
        }
    }
}
