//! Status-change notification dispatch.
//!
//! Invoked only when a reconciliation pass actually changes a completion
//! state. Delivery is best-effort: the completion write is the authoritative
//! side effect and is never rolled back on a failed send.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use proctorsync_core::policy::ReviewStatus;
use proctorsync_core::types::{ParticipantRecord, User};

/// Errors from the notification subsystem.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Mail gateway configuration problem.
    #[error("Mail gateway configuration error: {0}")]
    Config(String),

    /// HTTP request to the gateway failed.
    #[error("Mail request error: {0}")]
    Request(String),

    /// The gateway returned a non-success status.
    #[error("Mail gateway error (status {status}): {body}")]
    Gateway {
        /// HTTP status code returned by the gateway.
        status: u16,
        /// Response body from the gateway.
        body: String,
    },
}

/// A rendered status e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound e-mail delivery collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, message: &StatusEmail) -> Result<(), NotifyError>;
}

/// A mailer that only logs the message. Used when no gateway is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, message: &StatusEmail) -> Result<(), NotifyError> {
        info!(to = %message.to, subject = %message.subject, "Status e-mail (log only)");
        Ok(())
    }
}

/// Builds and sends the review-status e-mail for a completion change.
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    /// Create a dispatcher over the given mailer.
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Render the status e-mail for a participant's current review outcome.
    ///
    /// Only an `Invalid (ID)` review carries the resubmission link; the
    /// participant can fix their photo ID, every other status is either
    /// pending or final.
    pub fn build_email(user: &User, record: &ParticipantRecord, course_id: i64) -> StatusEmail {
        let status_label = ReviewStatus::from_wire(&record.review_status)
            .map_or(record.review_status.as_str(), |s| s.label());

        let mut body = format!(
            "Hello {} {},\n\nThe proctoring review for your activity in course {} \
             has been updated.\n\nLatest status: {}\n",
            user.first_name, user.last_name, course_id, status_label
        );
        if ReviewStatus::from_wire(&record.review_status) == Some(ReviewStatus::InvalidId)
            && let Some(url) = &record.resubmit_url
        {
            body.push_str(&format!(
                "\nYour photo ID could not be verified. You can resubmit it here: {url}\n"
            ));
        }

        StatusEmail {
            to: user.email.clone(),
            subject: "Proctoring review status update".to_string(),
            body,
        }
    }

    /// Send the status e-mail for a changed completion state.
    pub async fn send(
        &self,
        user: &User,
        record: &ParticipantRecord,
        course_id: i64,
    ) -> Result<(), NotifyError> {
        let email = Self::build_email(user, record, course_id);
        debug!(user_id = user.id, course_id, "Sending status notification");
        self.mailer.send_email(&email).await
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "student@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    fn record(status: &str, resubmit_url: Option<&str>) -> ParticipantRecord {
        ParticipantRecord {
            identifier_token: "352d37".into(),
            review_status: status.into(),
            created_at: 0,
            modified_at: 0,
            resubmit_url: resubmit_url.map(str::to_string),
            flags: vec![],
        }
    }

    #[test]
    fn email_addresses_the_user() {
        let email = NotificationDispatcher::build_email(&user(), &record("Valid", None), 5);
        assert_eq!(email.to, "student@example.com");
        assert!(email.body.contains("Ada Lovelace"));
        assert!(email.body.contains("course 5"));
    }

    #[test]
    fn valid_status_has_no_resubmit_link() {
        let email = NotificationDispatcher::build_email(
            &user(),
            &record("Valid", Some("https://vendor.example.com/resubmit")),
            5,
        );
        assert!(email.body.contains("Valid"));
        assert!(!email.body.contains("resubmit"));
    }

    #[test]
    fn invalid_id_includes_resubmit_link() {
        let email = NotificationDispatcher::build_email(
            &user(),
            &record("Invalid (ID)", Some("https://vendor.example.com/resubmit/abc")),
            5,
        );
        assert!(email.body.contains("Invalid (ID)"));
        assert!(email.body.contains("https://vendor.example.com/resubmit/abc"));
    }

    #[test]
    fn invalid_id_without_link_omits_resubmit_section() {
        let email =
            NotificationDispatcher::build_email(&user(), &record("Invalid (ID)", None), 5);
        assert!(!email.body.contains("resubmit it here"));
    }

    #[test]
    fn unknown_status_falls_back_to_raw_value() {
        let email = NotificationDispatcher::build_email(&user(), &record("Pending", None), 5);
        assert!(email.body.contains("Pending"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let dispatcher = NotificationDispatcher::new(Arc::new(LogMailer));
        let result = dispatcher.send(&user(), &record("Valid", None), 5).await;
        assert!(result.is_ok());
    }
}
