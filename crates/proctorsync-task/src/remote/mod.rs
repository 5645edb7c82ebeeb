//! Remote proctoring API access.
//!
//! [`ParticipantClient`] talks to the vendor REST API: it pages through
//! participant review records modified since a watermark and closes stale
//! remote sessions. The engine consumes it through the [`ParticipantSource`]
//! trait so tests can substitute an in-memory fake.

pub mod client;
pub mod types;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests;

pub use client::{ParticipantClient, RemoteConfig};

use async_trait::async_trait;
use thiserror::Error;

use proctorsync_core::types::ParticipantRecord;

/// Remote API errors.
///
/// `Unauthorized` and `Unavailable` are integration-point-local: the point is
/// skipped for the current run and retried on the next one through the
/// watermark mechanism. `Malformed` on a single page is treated the same way
/// since the page boundary is the smallest fetch unit.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote API rejected the credentials (HTTP 401/403).
    #[error("Remote API rejected credentials (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The remote API could not be reached, timed out, or answered with a
    /// server-side error.
    #[error("Remote API unavailable: {0}")]
    Unavailable(String),

    /// The request could not be constructed or the response payload could
    /// not be decoded.
    #[error("Malformed remote request or payload: {0}")]
    Malformed(String),
}

/// Read side of the remote API, as consumed by the reconciliation engine.
///
/// The record sequence is lazy and non-restartable: callers page forward
/// from 1 until a page shorter than [`page_size`](Self::page_size), and a
/// re-fetch requires a fresh watermark.
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    /// Fetch one page of participant records modified since `since`
    /// (unix seconds), in the order the remote API returns them.
    async fn fetch_page(
        &self,
        api_key: &str,
        application_id: &str,
        since: i64,
        page: usize,
    ) -> Result<Vec<ParticipantRecord>, RemoteError>;

    /// Close a remote proctoring session. Idempotent: closing an
    /// already-closed or unknown session is not an error.
    async fn close_session(
        &self,
        api_key: &str,
        application_id: &str,
        activity_id: i64,
        user_id: i64,
    ) -> Result<(), RemoteError>;

    /// Records per page; a shorter page ends the sequence.
    fn page_size(&self) -> usize;
}
