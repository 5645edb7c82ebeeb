//! Completion-state reconciliation.
//!
//! One sync pass walks every eligible integration point, pulls the remote
//! review outcomes modified since the watermark, and converges local
//! completion records onto them.

pub mod engine;
pub mod report;

pub use engine::{ReconciliationEngine, RunContext};
pub use report::{PointOutcome, PointReport, PointStats, RecordSkip, RunReport, SkipReason};

use thiserror::Error;

use crate::host::HostError;

/// Run-level reconciliation errors.
///
/// Record- and point-local failures are absorbed into the run report; only a
/// failure to enumerate integration points (or to evaluate the site-level
/// gate) aborts the run, and the scheduler applies its own retry policy.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Reconciliation run failed: {0}")]
    Host(#[from] HostError),
}
