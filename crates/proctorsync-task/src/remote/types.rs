//! Vendor API response payloads and their normalization.
//!
//! Deserialization structs matching the vendor's PascalCase JSON, plus the
//! conversion into the internal [`ParticipantRecord`] representation.

use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use proctorsync_core::types::{ParticipantFlag, ParticipantRecord};

/// Raw participant object as returned by the vendor API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawParticipant {
    pub participant_identifier: String,
    pub review_status: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub resubmit_url: Option<String>,
    #[serde(default)]
    pub flags: Vec<RawFlag>,
}

/// Raw reviewer flag attached to a participant session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawFlag {
    #[serde(default)]
    pub flag_type: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

impl RawParticipant {
    /// Normalize the raw payload into the internal representation.
    ///
    /// Wire timestamps are informational: absent or unparseable values
    /// normalize to 0 rather than failing the record. The status string is
    /// trimmed and an empty resubmission link becomes `None`.
    pub fn normalize(self) -> ParticipantRecord {
        ParticipantRecord {
            identifier_token: self.participant_identifier,
            review_status: self.review_status.trim().to_string(),
            created_at: self.created.as_deref().and_then(parse_api_timestamp).unwrap_or(0),
            modified_at: self.modified.as_deref().and_then(parse_api_timestamp).unwrap_or(0),
            resubmit_url: self.resubmit_url.filter(|url| !url.is_empty()),
            flags: self.flags.into_iter().map(RawFlag::normalize).collect(),
        }
    }
}

impl RawFlag {
    fn normalize(self) -> ParticipantFlag {
        ParticipantFlag {
            flag_type: self.flag_type,
            comment: self.comment.filter(|c| !c.is_empty()),
            created_at: self.created.as_deref().and_then(parse_api_timestamp),
        }
    }
}

/// Parse an RFC 3339 wire timestamp into unix seconds.
pub(crate) fn parse_api_timestamp(value: &str) -> Option<i64> {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .map(OffsetDateTime::unix_timestamp)
}

/// Format unix seconds as the RFC 3339 UTC timestamp the API filters on.
pub(crate) fn format_api_timestamp(ts: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}
