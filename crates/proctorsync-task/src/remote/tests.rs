//! Tests for the vendor API client and payload normalization.

use reqwest::StatusCode;

use super::client::{ParticipantClient, RemoteConfig};
use super::types::{RawParticipant, format_api_timestamp, parse_api_timestamp};
use super::{ParticipantSource, RemoteError};

fn test_config() -> RemoteConfig {
    RemoteConfig {
        base_url: "https://api.example.com".into(),
        timeout: std::time::Duration::from_secs(5),
        page_size: 100,
    }
}

// =============================================================================
// Client construction tests
// =============================================================================

#[test]
fn empty_base_url_returns_error() {
    let config = RemoteConfig {
        base_url: String::new(),
        ..test_config()
    };
    let err = ParticipantClient::new(&config).unwrap_err();
    assert!(matches!(err, RemoteError::Malformed(_)));
}

#[test]
fn valid_config_creates_client() {
    assert!(ParticipantClient::new(&test_config()).is_ok());
}

#[test]
fn trailing_slash_stripped_from_base_url() {
    let config = RemoteConfig {
        base_url: "https://api.example.com/".into(),
        ..test_config()
    };
    let client = ParticipantClient::new(&config).unwrap();
    let url = client.api_url("/participants");
    assert_eq!(url, "https://api.example.com/api/participants");
    assert!(!url.contains("//api"));
}

#[test]
fn zero_page_size_uses_default() {
    let config = RemoteConfig {
        page_size: 0,
        ..test_config()
    };
    let client = ParticipantClient::new(&config).unwrap();
    assert_eq!(client.page_size(), 100);
}

#[test]
fn custom_page_size_respected() {
    let config = RemoteConfig {
        page_size: 25,
        ..test_config()
    };
    let client = ParticipantClient::new(&config).unwrap();
    assert_eq!(client.page_size(), 25);
}

#[test]
fn bearer_rejects_control_characters() {
    let err = ParticipantClient::bearer("key\nwith-newline").unwrap_err();
    assert!(matches!(err, RemoteError::Malformed(_)));
}

// =============================================================================
// Status mapping tests
// =============================================================================

#[test]
fn unauthorized_statuses_map_to_unauthorized() {
    for code in [401u16, 403] {
        let status = StatusCode::from_u16(code).unwrap();
        let err = ParticipantClient::check_status(status).unwrap_err();
        assert!(matches!(err, RemoteError::Unauthorized { status } if status == code));
    }
}

#[test]
fn server_errors_map_to_unavailable() {
    for code in [429u16, 500, 502, 503] {
        let status = StatusCode::from_u16(code).unwrap();
        let err = ParticipantClient::check_status(status).unwrap_err();
        assert!(matches!(err, RemoteError::Unavailable(_)), "HTTP {code}");
    }
}

#[test]
fn other_client_errors_map_to_malformed() {
    let err = ParticipantClient::check_status(StatusCode::BAD_REQUEST).unwrap_err();
    assert!(matches!(err, RemoteError::Malformed(_)));
}

#[test]
fn success_statuses_pass() {
    assert!(ParticipantClient::check_status(StatusCode::OK).is_ok());
    assert!(ParticipantClient::check_status(StatusCode::NO_CONTENT).is_ok());
}

// =============================================================================
// Timestamp conversion tests
// =============================================================================

#[test]
fn format_timestamp_is_rfc3339_utc() {
    assert_eq!(
        format_api_timestamp(0).unwrap(),
        "1970-01-01T00:00:00Z"
    );
    assert_eq!(
        format_api_timestamp(1_700_000_000).unwrap(),
        "2023-11-14T22:13:20Z"
    );
}

#[test]
fn parse_timestamp_roundtrips_format() {
    let formatted = format_api_timestamp(1_700_000_000).unwrap();
    assert_eq!(parse_api_timestamp(&formatted), Some(1_700_000_000));
}

#[test]
fn parse_timestamp_accepts_offsets() {
    assert_eq!(
        parse_api_timestamp("2023-11-14T17:13:20-05:00"),
        Some(1_700_000_000)
    );
}

#[test]
fn parse_timestamp_rejects_garbage() {
    assert_eq!(parse_api_timestamp("not a date"), None);
    assert_eq!(parse_api_timestamp(""), None);
}

// =============================================================================
// Deserialization and normalization tests
// =============================================================================

#[test]
fn deserialize_participant_full() {
    let json = r#"{
        "ParticipantIdentifier": "352d37",
        "ReviewStatus": "Valid",
        "Created": "2023-11-14T22:13:20Z",
        "Modified": "2023-11-14T23:13:20Z",
        "ResubmitUrl": "https://vendor.example.com/resubmit/abc",
        "Flags": [
            {"FlagType": "lighting", "Comment": "Face partially obscured", "Created": "2023-11-14T22:30:00Z"}
        ]
    }"#;
    let raw: RawParticipant = serde_json::from_str(json).unwrap();
    let record = raw.normalize();

    assert_eq!(record.identifier_token, "352d37");
    assert_eq!(record.review_status, "Valid");
    assert_eq!(record.created_at, 1_700_000_000);
    assert_eq!(record.modified_at, 1_700_003_600);
    assert_eq!(
        record.resubmit_url.as_deref(),
        Some("https://vendor.example.com/resubmit/abc")
    );
    assert_eq!(record.flags.len(), 1);
    assert_eq!(record.flags[0].flag_type, "lighting");
    assert_eq!(record.flags[0].comment.as_deref(), Some("Face partially obscured"));
    assert!(record.flags[0].created_at.is_some());
}

#[test]
fn deserialize_participant_minimal() {
    let json = r#"{
        "ParticipantIdentifier": "352d37",
        "ReviewStatus": "In Progress"
    }"#;
    let raw: RawParticipant = serde_json::from_str(json).unwrap();
    let record = raw.normalize();

    assert_eq!(record.review_status, "In Progress");
    assert_eq!(record.created_at, 0);
    assert_eq!(record.modified_at, 0);
    assert!(record.resubmit_url.is_none());
    assert!(record.flags.is_empty());
}

#[test]
fn normalize_trims_status_and_drops_empty_resubmit() {
    let json = r#"{
        "ParticipantIdentifier": "352d37",
        "ReviewStatus": "  Valid  ",
        "ResubmitUrl": ""
    }"#;
    let raw: RawParticipant = serde_json::from_str(json).unwrap();
    let record = raw.normalize();

    assert_eq!(record.review_status, "Valid");
    assert!(record.resubmit_url.is_none());
}

#[test]
fn normalize_tolerates_bad_timestamps() {
    let json = r#"{
        "ParticipantIdentifier": "352d37",
        "ReviewStatus": "Valid",
        "Created": "yesterday-ish",
        "Modified": "2023-13-99T99:99:99Z"
    }"#;
    let raw: RawParticipant = serde_json::from_str(json).unwrap();
    let record = raw.normalize();

    assert_eq!(record.created_at, 0);
    assert_eq!(record.modified_at, 0);
}

// =============================================================================
// Error display tests
// =============================================================================

#[test]
fn remote_error_display() {
    assert_eq!(
        RemoteError::Unauthorized { status: 401 }.to_string(),
        "Remote API rejected credentials (HTTP 401)"
    );
    assert_eq!(
        RemoteError::Unavailable("HTTP 503".into()).to_string(),
        "Remote API unavailable: HTTP 503"
    );
}
