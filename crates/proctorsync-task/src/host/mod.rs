//! Host platform collaborators.
//!
//! The engine never reaches into the host LMS directly; everything it needs
//! (integration points, completion records, users, enrollment, last-access
//! times) goes through these narrow async traits. [`HostDatabase`] implements
//! the lookup traits over the host schema; [`MailGateway`](mail::MailGateway)
//! implements the outbound [`Mailer`](crate::notify::Mailer).

pub mod db;
pub mod mail;

pub use db::HostDatabase;
pub use mail::{MailGateway, MailGatewayConfig};

use async_trait::async_trait;
use thiserror::Error;

use proctorsync_core::db::DatabaseError;
use proctorsync_core::policy::CompletionState;
use proctorsync_core::types::{
    CompletionRecord, CompletionScope, IntegrationPoint, TrackingMode, User,
};

/// Host collaborator errors.
///
/// Record- or point-local from the engine's perspective, except when raised
/// by [`IntegrationPointSource::list_eligible`], which is the one run-level
/// failure.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host database failed.
    #[error("Host database error: {0}")]
    Database(#[from] DatabaseError),

    /// A host lookup returned something the sync cannot work with.
    #[error("Host lookup failed: {0}")]
    Lookup(String),
}

/// Enumerates the integration points eligible for a sync pass.
#[async_trait]
pub trait IntegrationPointSource: Send + Sync {
    /// All visible integration points, in stable order. Credential and
    /// binding-level checks happen in the engine's gates, not here.
    async fn list_eligible(&self) -> Result<Vec<IntegrationPoint>, HostError>;
}

/// Read/write access to the host completion subsystem.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Whether completion tracking is enabled for the given scope.
    async fn is_completion_enabled(&self, scope: CompletionScope) -> Result<bool, HostError>;

    /// How the activity tracks completion.
    async fn activity_completion_mode(&self, activity_id: i64) -> Result<TrackingMode, HostError>;

    /// Current completion record for a user on an activity. An absent row
    /// reads as `Incomplete` with `time_modified = 0`.
    async fn completion_record(
        &self,
        activity_id: i64,
        user_id: i64,
    ) -> Result<CompletionRecord, HostError>;

    /// Write a new completion state for a user on an activity.
    async fn set_completion_record(
        &self,
        activity_id: i64,
        user_id: i64,
        state: CompletionState,
        override_by: Option<i64>,
        time_modified: i64,
    ) -> Result<(), HostError>;

    /// Creation time of a course (watermark input).
    async fn course_created(&self, course_id: i64) -> Result<i64, HostError>;

    /// Creation time of the site (watermark input).
    async fn site_created(&self) -> Result<i64, HostError>;
}

/// User lookups in the host platform.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a local user id; deleted or unknown users yield `None`.
    async fn resolve_user(&self, user_id: i64) -> Result<Option<User>, HostError>;

    /// Whether the user is still enrolled in the course.
    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool, HostError>;

    /// The user's last recorded activity in the course, if any.
    async fn last_activity_time(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<i64>, HostError>;
}
