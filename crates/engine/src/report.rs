//! Run state and the audit report
//!
//! `RunContext` is created once per run and threaded through the
//! coordinator and sequencer by `&mut`. It turns into a `RunReport` at the
//! end, which is what the CLI prints and serializes.

use autosnap_core::Frequency;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// A recorded, non-fatal run error
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    #[error("pool {pool} is not healthy: {reason}")]
    UnhealthyVolume { pool: String, reason: String },

    #[error("failed to list {frequency} snapshots for {dataset}: {message}")]
    Listing {
        pool: String,
        dataset: String,
        frequency: Frequency,
        message: String,
    },

    #[error("failed to create snapshot {dataset}@{snapshot}: {message}")]
    Create {
        pool: String,
        dataset: String,
        frequency: Frequency,
        snapshot: String,
        message: String,
    },
}

impl RunError {
    /// A failed create means a period may have gone without coverage
    pub fn is_safety_critical(&self) -> bool {
        matches!(self, RunError::Create { .. })
    }
}

/// A deletion the backend rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub snapshot: String,
    pub message: String,
}

/// Terminal state of one frequency pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    Done,
    Disabled,
    Aborted,
}

/// What happened on the create side of a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CreateDecision {
    /// A snapshot for the current period already existed
    Covered { existing: String },
    Created { name: String },
    /// Dry-run stand-in for `Created`
    WouldCreate { name: String },
    Failed { name: String },
    /// No create step (disabled frequency or listing failure)
    Skipped,
}

/// Decision record for one (pool, dataset, frequency)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyOutcome {
    pub pool: String,
    pub dataset: String,
    pub frequency: Frequency,
    pub state: PassState,
    pub creation: CreateDecision,
    pub kept: Vec<String>,
    /// Deleted, or would-be-deleted in dry-run
    pub deleted: Vec<String>,
    pub delete_failures: Vec<DeleteFailure>,
    pub skipped_by_budget: Vec<String>,
    /// Snapshot the minimum-retention guard held back
    pub rescued: Option<String>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl FrequencyOutcome {
    pub fn new(pool: &str, dataset: &str, frequency: Frequency, dry_run: bool) -> Self {
        Self {
            pool: pool.to_string(),
            dataset: dataset.to_string(),
            frequency,
            state: PassState::Done,
            creation: CreateDecision::Skipped,
            kept: Vec::new(),
            deleted: Vec::new(),
            delete_failures: Vec::new(),
            skipped_by_budget: Vec::new(),
            rescued: None,
            dry_run,
            error: None,
        }
    }

    pub fn abort(mut self, error: RunError) -> Self {
        self.state = PassState::Aborted;
        self.error = Some(error);
        self
    }
}

/// Why a descriptor was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotInPoolWhitelist,
    NotInFilesystemWhitelist,
    Unhealthy,
    /// Pool roots only get reporting
    PoolRoot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeSkip {
    pub pool: String,
    pub filesystem: Option<String>,
    pub reason: SkipReason,
}

/// Mutable state of a single run
#[derive(Debug)]
pub struct RunContext {
    pub dry_run: bool,
    pub max_deletions: usize,
    pub started_at: DateTime<Utc>,
    pub created: usize,
    pub deleted: usize,
    pub delete_failures: usize,
    pub skipped_by_budget: usize,
    pub rescued: usize,
    budget_warned: bool,
    errors: Vec<RunError>,
    outcomes: Vec<FrequencyOutcome>,
    skipped: Vec<VolumeSkip>,
}

impl RunContext {
    pub fn new(dry_run: bool, max_deletions: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            dry_run,
            max_deletions,
            started_at,
            created: 0,
            deleted: 0,
            delete_failures: 0,
            skipped_by_budget: 0,
            rescued: 0,
            budget_warned: false,
            errors: Vec::new(),
            outcomes: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// True while the deletion budget has room
    pub fn can_delete(&self) -> bool {
        self.deleted < self.max_deletions
    }

    /// Count a budget skip; warns on the first one of the run
    pub fn note_budget_exhausted(&mut self) {
        self.skipped_by_budget += 1;
        if !self.budget_warned {
            self.budget_warned = true;
            warn!(
                limit = self.max_deletions,
                "Reached deletion limit - skipping remaining deletions"
            );
        }
    }

    pub fn record_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Store a pass outcome, recording its error if any
    pub fn push_outcome(&mut self, outcome: FrequencyOutcome) {
        if let Some(error) = &outcome.error {
            self.errors.push(error.clone());
        }
        self.outcomes.push(outcome);
    }

    pub fn skip(&mut self, pool: &str, filesystem: Option<&str>, reason: SkipReason) {
        self.skipped.push(VolumeSkip {
            pool: pool.to_string(),
            filesystem: filesystem.map(str::to_string),
            reason,
        });
    }

    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    pub fn outcomes(&self) -> &[FrequencyOutcome] {
        &self.outcomes
    }

    pub fn into_report(self, finished_at: DateTime<Utc>) -> RunReport {
        RunReport {
            started_at: self.started_at,
            finished_at,
            dry_run: self.dry_run,
            success: self.errors.is_empty(),
            snapshots_created: self.created,
            snapshots_deleted: self.deleted,
            delete_failures: self.delete_failures,
            skipped_by_budget: self.skipped_by_budget,
            rescued: self.rescued,
            outcomes: self.outcomes,
            skipped_volumes: self.skipped,
            errors: self.errors,
        }
    }
}

/// Result of a run, serializable for audits
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub success: bool,
    pub snapshots_created: usize,
    pub snapshots_deleted: usize,
    pub delete_failures: usize,
    pub skipped_by_budget: usize,
    pub rescued: usize,
    pub outcomes: Vec<FrequencyOutcome>,
    pub skipped_volumes: Vec<VolumeSkip>,
    pub errors: Vec<RunError>,
}

impl RunReport {
    /// True iff no error was recorded
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_safety_critical_errors(&self) -> bool {
        self.errors.iter().any(RunError::is_safety_critical)
    }

    /// Outcomes for one dataset
    pub fn outcomes_for<'a>(&'a self, dataset: &'a str) -> impl Iterator<Item = &'a FrequencyOutcome> {
        self.outcomes.iter().filter(move |o| o.dataset == dataset)
    }
}
