#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for the SQLite host adapter.
//!
//! Runs the collaborator trait implementations against an in-memory host
//! schema seeded through the raw pool.

use proctorsync_core::policy::CompletionState;
use proctorsync_core::types::{CompletionScope, TrackingMode};

use proctorsync_task::host::{
    CompletionStore, HostDatabase, HostError, IntegrationPointSource, UserDirectory,
};

/// In-memory host DB with one course (5), one activity (42, automatic
/// tracking), one enrolled user (7), and completion enabled everywhere.
async fn seeded_db() -> HostDatabase {
    let db = HostDatabase::open_in_memory().await.unwrap();

    sqlx::query("INSERT INTO site_config (id, completion_enabled, created_at) VALUES (1, 1, 100)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO courses (id, completion_enabled, created_at) VALUES (5, 1, 200)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO activities (id, course_id, completion) VALUES (42, 5, 2)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO users (id, email, first_name, last_name, deleted)
         VALUES (7, 'ada@example.com', 'Ada', 'Lovelace', 0)",
    )
    .execute(db.pool())
    .await
    .unwrap();
    sqlx::query("INSERT INTO enrollments (course_id, user_id) VALUES (5, 7)")
        .execute(db.pool())
        .await
        .unwrap();

    db
}

// =========================================================================
// Integration point listing
// =========================================================================

#[tokio::test]
async fn list_eligible_returns_visible_points_in_order() {
    let db = seeded_db().await;
    sqlx::query(
        "INSERT INTO integration_points (application_id, api_key, course_id, activity_id, visible, created_at)
         VALUES ('A', 'K', 5, 42, 1, 300), ('B', 'K2', 5, NULL, 1, 400), ('C', 'K3', 5, 42, 0, 500)",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let points = db.list_eligible().await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].application_id, "A");
    assert_eq!(points[0].activity_id, Some(42));
    assert_eq!(points[0].created_at, 300);
    assert_eq!(points[1].application_id, "B");
    assert_eq!(points[1].activity_id, None);
}

#[tokio::test]
async fn list_eligible_empty_schema_is_empty() {
    let db = HostDatabase::open_in_memory().await.unwrap();
    assert!(db.list_eligible().await.unwrap().is_empty());
}

// =========================================================================
// Completion store
// =========================================================================

#[tokio::test]
async fn completion_enabled_checks() {
    let db = seeded_db().await;
    assert!(db.is_completion_enabled(CompletionScope::Site).await.unwrap());
    assert!(
        db.is_completion_enabled(CompletionScope::Course(5))
            .await
            .unwrap()
    );
    // Unknown course reads as disabled, not as an error.
    assert!(
        !db.is_completion_enabled(CompletionScope::Course(999))
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn missing_site_config_reads_as_disabled() {
    let db = HostDatabase::open_in_memory().await.unwrap();
    assert!(!db.is_completion_enabled(CompletionScope::Site).await.unwrap());
    assert_eq!(db.site_created().await.unwrap(), 0);
}

#[tokio::test]
async fn activity_completion_mode_maps_codes() {
    let db = seeded_db().await;
    sqlx::query("INSERT INTO activities (id, course_id, completion) VALUES (43, 5, 0), (44, 5, 1)")
        .execute(db.pool())
        .await
        .unwrap();

    assert_eq!(
        db.activity_completion_mode(42).await.unwrap(),
        TrackingMode::Automatic
    );
    assert_eq!(
        db.activity_completion_mode(43).await.unwrap(),
        TrackingMode::None
    );
    assert_eq!(
        db.activity_completion_mode(44).await.unwrap(),
        TrackingMode::Manual
    );
}

#[tokio::test]
async fn unknown_activity_is_an_error() {
    let db = seeded_db().await;
    let err = db.activity_completion_mode(999).await.unwrap_err();
    assert!(matches!(err, HostError::Database(_)));
}

#[tokio::test]
async fn absent_completion_record_reads_as_incomplete() {
    let db = seeded_db().await;
    let record = db.completion_record(42, 7).await.unwrap();
    assert_eq!(record.state, CompletionState::Incomplete);
    assert_eq!(record.time_modified, 0);
    assert!(record.override_by.is_none());
}

#[tokio::test]
async fn set_completion_record_inserts_then_updates() {
    let db = seeded_db().await;

    db.set_completion_record(42, 7, CompletionState::Complete, Some(7), 1_000)
        .await
        .unwrap();
    let record = db.completion_record(42, 7).await.unwrap();
    assert_eq!(record.state, CompletionState::Complete);
    assert_eq!(record.time_modified, 1_000);
    assert_eq!(record.override_by, Some(7));

    // Same (activity, user) pair: the row is updated, not duplicated.
    db.set_completion_record(42, 7, CompletionState::CompleteFail, Some(7), 2_000)
        .await
        .unwrap();
    let record = db.completion_record(42, 7).await.unwrap();
    assert_eq!(record.state, CompletionState::CompleteFail);
    assert_eq!(record.time_modified, 2_000);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM completion_records")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn watermark_inputs_come_from_creation_times() {
    let db = seeded_db().await;
    assert_eq!(db.site_created().await.unwrap(), 100);
    assert_eq!(db.course_created(5).await.unwrap(), 200);
    assert!(db.course_created(999).await.is_err());
}

// =========================================================================
// User directory
// =========================================================================

#[tokio::test]
async fn resolve_user_returns_profile() {
    let db = seeded_db().await;
    let user = db.resolve_user(7).await.unwrap().unwrap();
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.first_name, "Ada");
}

#[tokio::test]
async fn deleted_and_unknown_users_resolve_to_none() {
    let db = seeded_db().await;
    sqlx::query(
        "INSERT INTO users (id, email, first_name, last_name, deleted)
         VALUES (8, 'gone@example.com', 'Gone', 'User', 1)",
    )
    .execute(db.pool())
    .await
    .unwrap();

    assert!(db.resolve_user(8).await.unwrap().is_none());
    assert!(db.resolve_user(999).await.unwrap().is_none());
}

#[tokio::test]
async fn enrollment_checks() {
    let db = seeded_db().await;
    assert!(db.is_enrolled(5, 7).await.unwrap());
    assert!(!db.is_enrolled(5, 999).await.unwrap());
    assert!(!db.is_enrolled(999, 7).await.unwrap());
}

#[tokio::test]
async fn last_activity_time_lookup() {
    let db = seeded_db().await;
    assert!(db.last_activity_time(7, 5).await.unwrap().is_none());

    sqlx::query("INSERT INTO user_lastaccess (user_id, course_id, time_accessed) VALUES (7, 5, 12345)")
        .execute(db.pool())
        .await
        .unwrap();
    assert_eq!(db.last_activity_time(7, 5).await.unwrap(), Some(12_345));
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test]
async fn on_disk_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.db");

    {
        let db = HostDatabase::open(&path).await.unwrap();
        sqlx::query("INSERT INTO courses (id, completion_enabled, created_at) VALUES (5, 1, 200)")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO users (id, email) VALUES (7, 'ada@example.com')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db.set_completion_record(42, 7, CompletionState::Complete, Some(7), 1_000)
            .await
            .unwrap();
    }

    let db = HostDatabase::open(&path).await.unwrap();
    let record = db.completion_record(42, 7).await.unwrap();
    assert_eq!(record.state, CompletionState::Complete);
}
