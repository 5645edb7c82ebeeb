//! SQLite-backed host platform adapter.
//!
//! Implements the collaborator lookup traits over the slice of the host LMS
//! schema the task needs. The host owns every table here; the task only ever
//! writes completion_records.

use async_trait::async_trait;

use proctorsync_core::db::DatabaseError;
use proctorsync_core::policy::CompletionState;
use proctorsync_core::types::{
    CompletionRecord, CompletionScope, IntegrationPoint, TrackingMode, User,
};

use super::{CompletionStore, HostError, IntegrationPointSource, UserDirectory};

proctorsync_core::define_database!(HostDatabase, "Host schema migrations complete");

/// Row shape for completion_records.
#[derive(Debug, sqlx::FromRow)]
struct CompletionRow {
    activity_id: i64,
    user_id: i64,
    state: i64,
    time_modified: i64,
    override_by: Option<i64>,
}

impl CompletionRow {
    fn into_record(self) -> Result<CompletionRecord, HostError> {
        let state = CompletionState::from_code(self.state).ok_or_else(|| {
            HostError::Lookup(format!(
                "completion_records({}, {}) has unknown state code {}",
                self.activity_id, self.user_id, self.state
            ))
        })?;
        Ok(CompletionRecord {
            activity_id: self.activity_id,
            user_id: self.user_id,
            state,
            time_modified: self.time_modified,
            override_by: self.override_by,
        })
    }
}

#[async_trait]
impl IntegrationPointSource for HostDatabase {
    async fn list_eligible(&self) -> Result<Vec<IntegrationPoint>, HostError> {
        let points = sqlx::query_as::<_, IntegrationPoint>(
            "SELECT id, application_id, api_key, course_id, activity_id, created_at
             FROM integration_points WHERE visible = 1 ORDER BY id",
        )
        .fetch_all(self.pool())
        .await
        .map_err(DatabaseError::from)?;
        Ok(points)
    }
}

#[async_trait]
impl CompletionStore for HostDatabase {
    async fn is_completion_enabled(&self, scope: CompletionScope) -> Result<bool, HostError> {
        let enabled: Option<i64> = match scope {
            CompletionScope::Site => {
                sqlx::query_scalar("SELECT completion_enabled FROM site_config WHERE id = 1")
                    .fetch_optional(self.pool())
                    .await
                    .map_err(DatabaseError::from)?
            }
            CompletionScope::Course(course_id) => {
                sqlx::query_scalar("SELECT completion_enabled FROM courses WHERE id = ?")
                    .bind(course_id)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(DatabaseError::from)?
            }
        };
        // A missing row reads as disabled, not as an error.
        Ok(enabled.unwrap_or(0) != 0)
    }

    async fn activity_completion_mode(&self, activity_id: i64) -> Result<TrackingMode, HostError> {
        let code: i64 = sqlx::query_scalar("SELECT completion FROM activities WHERE id = ?")
            .bind(activity_id)
            .fetch_optional(self.pool())
            .await
            .map_err(DatabaseError::from)?
            .ok_or_else(|| {
                HostError::Database(DatabaseError::NotFound(format!("Activity {activity_id}")))
            })?;
        TrackingMode::from_code(code).ok_or_else(|| {
            HostError::Lookup(format!(
                "activity {activity_id} has unknown completion mode {code}"
            ))
        })
    }

    async fn completion_record(
        &self,
        activity_id: i64,
        user_id: i64,
    ) -> Result<CompletionRecord, HostError> {
        let row = sqlx::query_as::<_, CompletionRow>(
            "SELECT activity_id, user_id, state, time_modified, override_by
             FROM completion_records WHERE activity_id = ? AND user_id = ?",
        )
        .bind(activity_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(DatabaseError::from)?;

        match row {
            Some(row) => row.into_record(),
            // No row yet: the user has simply not completed the activity.
            None => Ok(CompletionRecord {
                activity_id,
                user_id,
                state: CompletionState::Incomplete,
                time_modified: 0,
                override_by: None,
            }),
        }
    }

    async fn set_completion_record(
        &self,
        activity_id: i64,
        user_id: i64,
        state: CompletionState,
        override_by: Option<i64>,
        time_modified: i64,
    ) -> Result<(), HostError> {
        sqlx::query(
            "INSERT INTO completion_records (activity_id, user_id, state, time_modified, override_by)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (activity_id, user_id) DO UPDATE SET
               state = excluded.state,
               time_modified = excluded.time_modified,
               override_by = excluded.override_by",
        )
        .bind(activity_id)
        .bind(user_id)
        .bind(state.as_code())
        .bind(time_modified)
        .bind(override_by)
        .execute(self.pool())
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn course_created(&self, course_id: i64) -> Result<i64, HostError> {
        let created: Option<i64> = sqlx::query_scalar("SELECT created_at FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_optional(self.pool())
            .await
            .map_err(DatabaseError::from)?;
        created.ok_or_else(|| {
            HostError::Database(DatabaseError::NotFound(format!("Course {course_id}")))
        })
    }

    async fn site_created(&self) -> Result<i64, HostError> {
        let created: Option<i64> =
            sqlx::query_scalar("SELECT created_at FROM site_config WHERE id = 1")
                .fetch_optional(self.pool())
                .await
                .map_err(DatabaseError::from)?;
        Ok(created.unwrap_or(0))
    }
}

#[async_trait]
impl UserDirectory for HostDatabase {
    async fn resolve_user(&self, user_id: i64) -> Result<Option<User>, HostError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, last_name FROM users WHERE id = ? AND deleted = 0",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
        .map_err(DatabaseError::from)?;
        Ok(user)
    }

    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool, HostError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE course_id = ? AND user_id = ?)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(DatabaseError::from)?;
        Ok(exists != 0)
    }

    async fn last_activity_time(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> Result<Option<i64>, HostError> {
        let time: Option<i64> = sqlx::query_scalar(
            "SELECT time_accessed FROM user_lastaccess WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(self.pool())
        .await
        .map_err(DatabaseError::from)?;
        Ok(time)
    }
}
