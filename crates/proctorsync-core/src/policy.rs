//! Completion policy: maps a remote review status to the local completion
//! state it should produce.
//!
//! Pure and total over the four statuses the vendor API reports; anything
//! else is a typed [`PolicyError::UnknownStatus`], which callers treat as a
//! record-local failure and never as a batch abort.

use thiserror::Error;

/// Review statuses the remote API reports for a participant session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewStatus {
    /// The integrity review has not finished yet.
    InProgress,
    /// The participant passed the integrity review.
    Valid,
    /// The submitted photo ID was rejected; the participant may resubmit.
    InvalidId,
    /// The participant violated the exam rules. Terminal.
    InvalidRules,
}

impl ReviewStatus {
    /// Parse the vendor wire value. Matching is exact on the trimmed string;
    /// the vendor contract is case-sensitive.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "In Progress" => Some(Self::InProgress),
            "Valid" => Some(Self::Valid),
            "Invalid (ID)" => Some(Self::InvalidId),
            "Invalid (Rules)" => Some(Self::InvalidRules),
            _ => None,
        }
    }

    /// The vendor wire value for this status.
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::InProgress => "In Progress",
            Self::Valid => "Valid",
            Self::InvalidId => "Invalid (ID)",
            Self::InvalidRules => "Invalid (Rules)",
        }
    }

    /// Human-readable label used in status e-mails.
    pub const fn label(self) -> &'static str {
        match self {
            Self::InProgress => "In progress",
            Self::Valid => "Valid",
            Self::InvalidId => "Invalid (ID)",
            Self::InvalidRules => "Invalid (Rules)",
        }
    }

    /// The completion state a review with this status should target.
    ///
    /// `InvalidId` stays incomplete: the participant is awaiting
    /// resubmission, which is not a terminal failure.
    pub const fn completion_state(self) -> CompletionState {
        match self {
            Self::InProgress | Self::InvalidId => CompletionState::Incomplete,
            Self::Valid => CompletionState::Complete,
            Self::InvalidRules => CompletionState::CompleteFail,
        }
    }
}

/// Local activity-completion states the policy can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionState {
    /// Review pending or awaiting resubmission.
    Incomplete,
    /// Passed integrity review.
    Complete,
    /// Failed on a terminal rule violation.
    CompleteFail,
}

impl CompletionState {
    /// Host-platform integer code for this state.
    ///
    /// Code 2 (complete-with-pass) exists in the host platform but is never
    /// produced by this policy.
    pub const fn as_code(self) -> i64 {
        match self {
            Self::Incomplete => 0,
            Self::Complete => 1,
            Self::CompleteFail => 3,
        }
    }

    /// Map a host-platform integer code back to a state.
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Incomplete),
            1 => Some(Self::Complete),
            3 => Some(Self::CompleteFail),
            _ => None,
        }
    }
}

/// Errors from applying the completion policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The vendor reported a status outside the known set.
    #[error("Unknown review status: {0:?}")]
    UnknownStatus(String),
}

/// Map a raw review status string to the completion state it should produce.
pub fn target_state(raw_status: &str) -> Result<CompletionState, PolicyError> {
    ReviewStatus::from_wire(raw_status)
        .map(ReviewStatus::completion_state)
        .ok_or_else(|| PolicyError::UnknownStatus(raw_status.to_string()))
}
