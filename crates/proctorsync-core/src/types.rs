//! Shared data model for the reconciliation pipeline.

use serde::{Deserialize, Serialize};

use crate::policy::CompletionState;

/// One configured binding between a course activity and a remote proctoring
/// application.
///
/// Created by host-side configuration; read-only to the reconciliation core.
/// `activity_id` is `None` for course- or site-level bindings, which the
/// engine does not process.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IntegrationPoint {
    pub id: i64,
    pub application_id: String,
    pub api_key: String,
    pub course_id: i64,
    pub activity_id: Option<i64>,
    pub created_at: i64,
}

impl IntegrationPoint {
    /// Whether both remote credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.application_id.is_empty() && !self.api_key.is_empty()
    }
}

/// A normalized remote-side report of one user's proctoring review outcome.
///
/// Immutable once constructed by the remote client; `review_status` keeps the
/// raw trimmed wire value so that the policy layer owns the interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    pub identifier_token: String,
    pub review_status: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub resubmit_url: Option<String>,
    pub flags: Vec<ParticipantFlag>,
}

/// A reviewer-attached flag on a participant session. Carried for
/// notification context only; the engine does not branch on flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantFlag {
    pub flag_type: String,
    pub comment: Option<String>,
    pub created_at: Option<i64>,
}

/// The host platform's per-user, per-activity completion record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionRecord {
    pub activity_id: i64,
    pub user_id: i64,
    pub state: CompletionState,
    pub time_modified: i64,
    pub override_by: Option<i64>,
}

/// A host-platform user, as much of it as notifications need.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Scope of a completion-tracking check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionScope {
    Site,
    Course(i64),
}

/// How an activity tracks completion in the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Completion is not tracked for the activity.
    None,
    /// The user marks the activity complete manually.
    Manual,
    /// The platform derives completion from conditions.
    Automatic,
}

impl TrackingMode {
    /// Host-platform integer code for this mode.
    pub const fn as_code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Manual => 1,
            Self::Automatic => 2,
        }
    }

    /// Map a host-platform integer code back to a mode.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Manual),
            2 => Some(Self::Automatic),
            _ => None,
        }
    }

    /// Whether completion is tracked at all.
    pub const fn is_tracked(self) -> bool {
        !matches!(self, Self::None)
    }
}
