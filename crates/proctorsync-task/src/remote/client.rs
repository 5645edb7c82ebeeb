//! Remote proctoring REST API client.
//!
//! Uses reqwest to call the vendor endpoints for participant listings and
//! session closing. Credentials are per integration point, so they travel
//! with each call instead of living in default headers.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::debug;

use async_trait::async_trait;

use proctorsync_core::types::ParticipantRecord;

use super::types::{RawParticipant, format_api_timestamp};
use super::{ParticipantSource, RemoteError};

/// Default number of participant records per fetched page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// Configuration for connecting to the vendor API.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// API base URL with no trailing slash (e.g. "<https://api.example.com>").
    pub base_url: String,
    /// Per-request timeout; a timed-out request surfaces as
    /// [`RemoteError::Unavailable`].
    pub timeout: std::time::Duration,
    /// Participant records per page; 0 selects the default.
    pub page_size: usize,
}

/// Vendor REST API client.
#[derive(Debug)]
pub struct ParticipantClient {
    http: reqwest::Client,
    base_url: String,
    page_size: usize,
}

impl ParticipantClient {
    /// Create a new vendor API client.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if config.base_url.is_empty() {
            return Err(RemoteError::Malformed("base_url is empty".into()));
        }

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let page_size = if config.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            config.page_size
        };

        Ok(Self {
            http,
            base_url,
            page_size,
        })
    }

    /// Build the API URL for a given path.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    /// Bearer authorization header for an integration point's API key.
    pub(crate) fn bearer(api_key: &str) -> Result<HeaderValue, RemoteError> {
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| RemoteError::Malformed("API key is not a valid header value".into()))
    }

    /// Map an HTTP response status into the remote error taxonomy.
    pub(crate) fn check_status(status: StatusCode) -> Result<(), RemoteError> {
        if status.is_success() {
            return Ok(());
        }
        match status.as_u16() {
            401 | 403 => Err(RemoteError::Unauthorized {
                status: status.as_u16(),
            }),
            429 => Err(RemoteError::Unavailable("rate limited (HTTP 429)".into())),
            s if status.is_server_error() => Err(RemoteError::Unavailable(format!("HTTP {s}"))),
            s => Err(RemoteError::Malformed(format!("unexpected HTTP {s}"))),
        }
    }
}

/// Map a reqwest transport error into the remote error taxonomy.
fn transport_error(e: &reqwest::Error) -> RemoteError {
    if e.is_timeout() || e.is_connect() {
        RemoteError::Unavailable(e.to_string())
    } else {
        RemoteError::Malformed(e.to_string())
    }
}

#[async_trait]
impl ParticipantSource for ParticipantClient {
    async fn fetch_page(
        &self,
        api_key: &str,
        application_id: &str,
        since: i64,
        page: usize,
    ) -> Result<Vec<ParticipantRecord>, RemoteError> {
        let since_param = format_api_timestamp(since)
            .ok_or_else(|| RemoteError::Malformed(format!("watermark {since} out of range")))?;
        let url = format!(
            "{}?applicationid={application_id}&lastmodified={since_param}&page={page}&perpage={}",
            self.api_url("/participants"),
            self.page_size
        );

        let resp = self
            .http
            .get(&url)
            .header(AUTHORIZATION, Self::bearer(api_key)?)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Self::check_status(resp.status())?;

        let raw: Vec<RawParticipant> = resp
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;

        debug!(application_id, page, count = raw.len(), "Fetched participant page");
        Ok(raw.into_iter().map(RawParticipant::normalize).collect())
    }

    async fn close_session(
        &self,
        api_key: &str,
        application_id: &str,
        activity_id: i64,
        user_id: i64,
    ) -> Result<(), RemoteError> {
        let url = format!(
            "{}?applicationid={application_id}&activityid={activity_id}&participantid={user_id}",
            self.api_url("/closesession"),
        );

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, Self::bearer(api_key)?)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = resp.status();
        // Already-closed or unknown sessions are a success: the call is idempotent.
        if matches!(status.as_u16(), 404 | 410) {
            debug!(application_id, user_id, "Remote session already closed");
            return Ok(());
        }
        Self::check_status(status)
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
