//! The reconciliation engine.
//!
//! Drives one full sync pass: enumerates eligible integration points, pages
//! through remote participant updates, resolves each record to a local
//! user/activity, applies the completion policy, persists state changes, and
//! triggers notifications. Per-record and per-point failures are logged and
//! counted, never escalated to a run failure.

use std::sync::Arc;

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use proctorsync_core::identifier;
use proctorsync_core::policy;
use proctorsync_core::timeout::SessionTimeoutPolicy;
use proctorsync_core::types::{CompletionScope, IntegrationPoint, ParticipantRecord};

use crate::host::{CompletionStore, IntegrationPointSource, UserDirectory};
use crate::notify::NotificationDispatcher;
use crate::remote::ParticipantSource;

use super::SyncError;
use super::report::{PointOutcome, PointReport, PointStats, RecordSkip, RunReport, SkipReason};

/// Inputs the host scheduler supplies for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    /// Current unix time, fixed for the whole run.
    pub now: i64,
    /// Unix time of the last successful run; 0 forces a full resync.
    pub last_run_time: i64,
}

/// Orchestrates one reconciliation pass over all integration points.
pub struct ReconciliationEngine {
    points: Arc<dyn IntegrationPointSource>,
    completion: Arc<dyn CompletionStore>,
    users: Arc<dyn UserDirectory>,
    remote: Arc<dyn ParticipantSource>,
    dispatcher: Arc<NotificationDispatcher>,
    timeout: SessionTimeoutPolicy,
    max_workers: usize,
}

impl ReconciliationEngine {
    /// Create an engine over the given collaborators.
    pub fn new(
        points: Arc<dyn IntegrationPointSource>,
        completion: Arc<dyn CompletionStore>,
        users: Arc<dyn UserDirectory>,
        remote: Arc<dyn ParticipantSource>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            points,
            completion,
            users,
            remote,
            dispatcher,
            timeout: SessionTimeoutPolicy::default(),
            max_workers: 1,
        }
    }

    /// Override the session timeout policy.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: SessionTimeoutPolicy) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of integration points processed concurrently (1 = sequential).
    /// Points are independent, so this is purely a throughput knob.
    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = if max_workers == 0 { 1 } else { max_workers };
        self
    }

    /// Execute one reconciliation pass.
    ///
    /// Returns the run report on success; the only error is a failure to
    /// evaluate the site gate or enumerate integration points.
    pub async fn run(
        self: Arc<Self>,
        ctx: RunContext,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunReport, SyncError> {
        let mut report = RunReport::default();

        // Completion tracking off site-wide means there is nothing to
        // reconcile anywhere; the run ends successfully.
        if !self
            .completion
            .is_completion_enabled(CompletionScope::Site)
            .await?
        {
            info!("Completion tracking is disabled site-wide; skipping run");
            report.run_skip = Some(SkipReason::SiteCompletionDisabled);
            return Ok(report);
        }

        let points = self.points.list_eligible().await?;
        info!(count = points.len(), "Enumerated integration points");

        if self.max_workers > 1 {
            report.points = Arc::clone(&self).run_pooled(points, ctx, &cancel).await;
        } else {
            for point in points {
                if *cancel.borrow() {
                    break;
                }
                report.points.push(self.point_report(point, ctx, cancel.clone()).await);
            }
        }

        report.cancelled = *cancel.borrow();
        Ok(report)
    }

    /// Process integration points through a bounded worker pool.
    ///
    /// Points are independent; only the report is merged afterwards, in the
    /// enumeration order.
    async fn run_pooled(
        self: Arc<Self>,
        points: Vec<IntegrationPoint>,
        ctx: RunContext,
        cancel: &watch::Receiver<bool>,
    ) -> Vec<PointReport> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut set: JoinSet<(usize, PointReport)> = JoinSet::new();

        for (index, point) in points.into_iter().enumerate() {
            if *cancel.borrow() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let engine = Arc::clone(&self);
            let cancel = cancel.clone();
            set.spawn(async move {
                let _permit = permit;
                (index, engine.point_report(point, ctx, cancel).await)
            });
        }

        let mut indexed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(entry) => indexed.push(entry),
                Err(e) => warn!(error = %e, "Integration point worker panicked"),
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, report)| report).collect()
    }

    /// Process one integration point and wrap the outcome in a report entry.
    async fn point_report(
        &self,
        point: IntegrationPoint,
        ctx: RunContext,
        cancel: watch::Receiver<bool>,
    ) -> PointReport {
        let outcome = self.process_point(&point, ctx, &cancel).await;
        if let PointOutcome::Skipped(reason) = &outcome {
            info!(
                point_id = point.id,
                course_id = point.course_id,
                reason = ?reason,
                "Integration point skipped"
            );
        }
        PointReport {
            point_id: point.id,
            course_id: point.course_id,
            outcome,
        }
    }

    /// Gate and process a single integration point.
    async fn process_point(
        &self,
        point: &IntegrationPoint,
        ctx: RunContext,
        cancel: &watch::Receiver<bool>,
    ) -> PointOutcome {
        // Gate 1: course-level completion tracking.
        match self
            .completion
            .is_completion_enabled(CompletionScope::Course(point.course_id))
            .await
        {
            Ok(true) => {}
            Ok(false) => return PointOutcome::Skipped(SkipReason::CourseCompletionDisabled),
            Err(e) => return PointOutcome::Skipped(SkipReason::HostFailed(e.to_string())),
        }

        // Gate 2: must be bound to a single activity, not course/site level.
        let Some(activity_id) = point.activity_id else {
            return PointOutcome::Skipped(SkipReason::NotActivityLevel);
        };

        // Gate 3: both remote credentials present.
        if !point.has_credentials() {
            return PointOutcome::Skipped(SkipReason::MissingCredentials);
        }

        // Gate 4: the activity actually tracks completion.
        match self.completion.activity_completion_mode(activity_id).await {
            Ok(mode) if mode.is_tracked() => {}
            Ok(_) => return PointOutcome::Skipped(SkipReason::TrackingDisabled),
            Err(e) => return PointOutcome::Skipped(SkipReason::HostFailed(e.to_string())),
        }

        let since = match self.watermark(point, ctx).await {
            Ok(since) => since,
            Err(e) => return PointOutcome::Skipped(SkipReason::HostFailed(e.to_string())),
        };
        debug!(
            point_id = point.id,
            course_id = point.course_id,
            since,
            "Fetching remote participants"
        );

        let mut stats = PointStats::default();
        let mut page = 1;
        'pages: loop {
            let batch = match self
                .remote
                .fetch_page(&point.api_key, &point.application_id, since, page)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        point_id = point.id,
                        course_id = point.course_id,
                        error = %e,
                        "Remote fetch failed; skipping integration point until next run"
                    );
                    return PointOutcome::Skipped(SkipReason::RemoteFailed(e.to_string()));
                }
            };
            let last_page = batch.len() < self.remote.page_size();

            for record in &batch {
                // Cancellation lets the in-flight record finish but does not
                // start another one.
                if *cancel.borrow() {
                    break 'pages;
                }
                stats.participants_seen += 1;
                self.process_record(point, activity_id, record, ctx, &mut stats)
                    .await;
            }

            if last_page || *cancel.borrow() {
                break;
            }
            page += 1;
        }

        info!(
            point_id = point.id,
            course_id = point.course_id,
            participants = stats.participants_seen,
            updated = stats.completions_updated,
            "Integration point processed"
        );
        PointOutcome::Processed(stats)
    }

    /// Watermark for one integration point, per the remote API's contract:
    /// only records modified after this instant are fetched.
    async fn watermark(
        &self,
        point: &IntegrationPoint,
        ctx: RunContext,
    ) -> Result<i64, crate::host::HostError> {
        let site = self.completion.site_created().await?;
        let course = self.completion.course_created(point.course_id).await?;
        Ok(ctx
            .last_run_time
            .max(site)
            .max(course)
            .max(point.created_at))
    }

    /// Steps (a)-(i) for one participant record. Failures are counted and
    /// logged; the batch always continues.
    async fn process_record(
        &self,
        point: &IntegrationPoint,
        activity_id: i64,
        record: &ParticipantRecord,
        ctx: RunContext,
        stats: &mut PointStats,
    ) {
        let token = record.identifier_token.as_str();

        // (a) Token sanity before decoding.
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
            debug!(point_id = point.id, token, "Identifier is not alphanumeric; skipping record");
            stats.record_skip(RecordSkip::InvalidIdentifier);
            return;
        }

        // (b) Decode the composite identifier.
        let decoded = match identifier::decode(token) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(point_id = point.id, token, error = %e, "Identifier decode failed; skipping record");
                stats.record_skip(RecordSkip::DecodeFailed);
                return;
            }
        };

        // (c) The record must belong to this point's course.
        if decoded.course_id != point.course_id {
            debug!(
                point_id = point.id,
                token,
                decoded_course = decoded.course_id,
                "Identifier belongs to a different course; skipping record"
            );
            stats.record_skip(RecordSkip::CourseMismatch);
            return;
        }

        // (d) Resolve the local user.
        let user = match self.users.resolve_user(decoded.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!(point_id = point.id, user_id = decoded.user_id, "No local user; skipping record");
                stats.record_skip(RecordSkip::UnknownUser);
                return;
            }
            Err(e) => {
                warn!(point_id = point.id, user_id = decoded.user_id, error = %e, "User lookup failed; skipping record");
                stats.record_skip(RecordSkip::HostFailed);
                return;
            }
        };

        // (e) Enrollment check; a dropped user gets their remote session
        // closed and produces no completion change.
        match self.users.is_enrolled(point.course_id, user.id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(
                    point_id = point.id,
                    user_id = user.id,
                    "User no longer enrolled; closing remote session and skipping record"
                );
                self.close_session(point, activity_id, user.id, stats).await;
                stats.record_skip(RecordSkip::NotEnrolled);
                return;
            }
            Err(e) => {
                warn!(point_id = point.id, user_id = user.id, error = %e, "Enrollment lookup failed; skipping record");
                stats.record_skip(RecordSkip::HostFailed);
                return;
            }
        }

        // (f) Timeout-driven close. Independent of the completion update
        // below; a stale session is closed and processing continues.
        match self.users.last_activity_time(user.id, point.course_id).await {
            Ok(Some(last_activity)) if self.timeout.should_close(last_activity, ctx.now) => {
                debug!(
                    point_id = point.id,
                    user_id = user.id,
                    last_activity,
                    "Course activity idle past timeout; closing remote session"
                );
                self.close_session(point, activity_id, user.id, stats).await;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(point_id = point.id, user_id = user.id, error = %e, "Last-access lookup failed; skipping timeout check");
            }
        }

        // (g) Policy: derive the target completion state.
        let target = match policy::target_state(&record.review_status) {
            Ok(target) => target,
            Err(e) => {
                warn!(point_id = point.id, user_id = user.id, error = %e, "Skipping record");
                stats.record_skip(RecordSkip::UnknownStatus);
                return;
            }
        };

        // (h) Idempotence: an unchanged state writes and notifies nothing.
        let current = match self.completion.completion_record(activity_id, user.id).await {
            Ok(current) => current,
            Err(e) => {
                warn!(point_id = point.id, user_id = user.id, error = %e, "Completion lookup failed; skipping record");
                stats.record_skip(RecordSkip::HostFailed);
                return;
            }
        };
        if current.state == target {
            debug!(
                point_id = point.id,
                user_id = user.id,
                state = ?target,
                "Completion already in target state"
            );
            return;
        }

        // (i) Persist the new state, then notify best-effort.
        if let Err(e) = self
            .completion
            .set_completion_record(activity_id, user.id, target, Some(user.id), ctx.now)
            .await
        {
            warn!(point_id = point.id, user_id = user.id, error = %e, "Completion write failed; skipping record");
            stats.record_skip(RecordSkip::HostFailed);
            return;
        }
        stats.completions_updated += 1;
        info!(
            point_id = point.id,
            user_id = user.id,
            state = ?target,
            "Completion state updated"
        );

        match self.dispatcher.send(&user, record, point.course_id).await {
            Ok(()) => stats.notifications_sent += 1,
            Err(e) => {
                // The completion write stands; notification is best-effort.
                warn!(point_id = point.id, user_id = user.id, error = %e, "Status notification failed");
                stats.notifications_failed += 1;
            }
        }
    }

    /// Close a remote session, counting success and logging failure.
    async fn close_session(
        &self,
        point: &IntegrationPoint,
        activity_id: i64,
        user_id: i64,
        stats: &mut PointStats,
    ) {
        match self
            .remote
            .close_session(&point.api_key, &point.application_id, activity_id, user_id)
            .await
        {
            Ok(()) => stats.sessions_closed += 1,
            Err(e) => {
                warn!(point_id = point.id, user_id, error = %e, "Failed to close remote session");
            }
        }
    }
}
