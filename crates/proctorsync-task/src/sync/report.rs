//! Run reporting for reconciliation passes.
//!
//! Everything record- and point-local ends up in counters here; operators see
//! the details through the logs, the scheduler sees the aggregate.

use std::collections::HashMap;

/// Why an integration point (or the whole run) was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Completion tracking is disabled site-wide (skips the whole run).
    SiteCompletionDisabled,
    /// Completion tracking is disabled for the course.
    CourseCompletionDisabled,
    /// The integration point is bound at course or site level, not to an
    /// activity.
    NotActivityLevel,
    /// applicationId or apiKey is missing.
    MissingCredentials,
    /// The target activity does not track completion.
    TrackingDisabled,
    /// The remote API failed for this point; retried next run via the
    /// watermark.
    RemoteFailed(String),
    /// A host collaborator failed while gating this point.
    HostFailed(String),
}

/// Why a single participant record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordSkip {
    /// Identifier token empty or not alphanumeric.
    InvalidIdentifier,
    /// Identifier token did not decode.
    DecodeFailed,
    /// Decoded course does not match the integration point's course.
    CourseMismatch,
    /// No local user for the decoded id.
    UnknownUser,
    /// The user is no longer enrolled.
    NotEnrolled,
    /// The vendor reported a status outside the known set.
    UnknownStatus,
    /// A host collaborator failed mid-record.
    HostFailed,
}

/// Counters for one processed integration point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointStats {
    pub participants_seen: u64,
    pub completions_updated: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub sessions_closed: u64,
    pub records_skipped: u64,
    skips: HashMap<RecordSkip, u64>,
}

impl PointStats {
    /// Count one skipped record under the given reason.
    pub fn record_skip(&mut self, reason: RecordSkip) {
        self.records_skipped += 1;
        *self.skips.entry(reason).or_insert(0) += 1;
    }

    /// Skipped-record count for one reason.
    pub fn skip_count(&self, reason: RecordSkip) -> u64 {
        self.skips.get(&reason).copied().unwrap_or(0)
    }
}

/// Outcome of one integration point within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointOutcome {
    /// All gates passed; records were processed (possibly zero).
    Processed(PointStats),
    /// A gate or the remote API rejected the point.
    Skipped(SkipReason),
}

/// Report for one integration point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointReport {
    pub point_id: i64,
    pub course_id: i64,
    pub outcome: PointOutcome,
}

/// Aggregated result of one reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub points: Vec<PointReport>,
    /// Set when the scheduler cancelled the run mid-pass.
    pub cancelled: bool,
    /// Set when the site-level completion gate skipped the entire run.
    pub run_skip: Option<SkipReason>,
}

impl RunReport {
    /// Stats of processed points, flattened.
    fn processed(&self) -> impl Iterator<Item = &PointStats> {
        self.points.iter().filter_map(|p| match &p.outcome {
            PointOutcome::Processed(stats) => Some(stats),
            PointOutcome::Skipped(_) => None,
        })
    }

    /// Number of integration points that passed all gates.
    pub fn points_processed(&self) -> usize {
        self.processed().count()
    }

    /// Number of integration points skipped at a gate or on remote failure.
    pub fn points_skipped(&self) -> usize {
        self.points.len() - self.points_processed()
    }

    /// Total participant records seen across all points.
    pub fn participants_seen(&self) -> u64 {
        self.processed().map(|s| s.participants_seen).sum()
    }

    /// Total completion-state writes across all points.
    pub fn completions_updated(&self) -> u64 {
        self.processed().map(|s| s.completions_updated).sum()
    }

    /// Total notifications sent across all points.
    pub fn notifications_sent(&self) -> u64 {
        self.processed().map(|s| s.notifications_sent).sum()
    }

    /// Total remote sessions closed across all points.
    pub fn sessions_closed(&self) -> u64 {
        self.processed().map(|s| s.sessions_closed).sum()
    }
}
