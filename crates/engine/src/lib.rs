//! Snapshot retention engine
//!
//! This crate provides:
//! - The storage backend seam (`VolumeBackend`) and an in-memory backend
//! - Retention policies (window cutoffs, freshness boundaries)
//! - Period-based classification and the zero-snapshot guard
//! - The create-then-delete sequencer and the run coordinator
//! - Run reports for auditing every decision

pub mod backend;
pub mod classify;
pub mod coordinator;
pub mod guard;
pub mod inspect;
pub mod memory;
pub mod options;
pub mod report;
pub mod retention;
pub mod sequencer;

// Re-exports
pub use backend::VolumeBackend;
pub use classify::{classify, keepers, Classification};
pub use coordinator::Coordinator;
pub use guard::enforce_minimum;
pub use memory::{BackendCall, MemoryBackend};
pub use options::RunOptions;
pub use report::{
    CreateDecision, DeleteFailure, FrequencyOutcome, PassState, RunContext, RunError, RunReport,
    SkipReason, VolumeSkip,
};
pub use retention::RetentionPolicy;
pub use sequencer::Sequencer;

/// Result type for engine and backend operations
pub type Result<T> = anyhow::Result<T>;
