//! Codec for the composite participant identifier exchanged with the remote
//! proctoring API.
//!
//! The remote side knows a participant only by an opaque token. The token is
//! the lowercase hex encoding of the ASCII string `"{course_id}-{user_id}"`,
//! which keeps it strictly alphanumeric so it can never collide with the
//! API's filter syntax.

use std::fmt::Write as _;

use thiserror::Error;

/// Errors from decoding a participant identifier token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The token is empty, not alphanumeric, or not a hex encoding of
    /// `"{course_id}-{user_id}"`.
    #[error("Malformed participant identifier: {0}")]
    Malformed(String),
}

/// A participant identifier token decoded back into its local parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedIdentifier {
    pub course_id: i64,
    pub user_id: i64,
}

/// Encode a (course, user) pair into the opaque API token.
///
/// Deterministic and reversible for non-negative ids:
/// `decode(&encode(c, u))` yields `(c, u)` again.
pub fn encode(course_id: i64, user_id: i64) -> String {
    let plain = format!("{course_id}-{user_id}");
    let mut token = String::with_capacity(plain.len() * 2);
    for byte in plain.bytes() {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// Decode an API token back into its (course, user) pair.
///
/// Fails with [`DecodeError::Malformed`] on any structural problem; there are
/// no partial successes.
pub fn decode(token: &str) -> Result<DecodedIdentifier, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Malformed("empty token".into()));
    }
    if !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(DecodeError::Malformed(format!(
            "token {token:?} contains non-alphanumeric characters"
        )));
    }
    if token.len() % 2 != 0 {
        return Err(DecodeError::Malformed(format!(
            "token {token:?} has odd length"
        )));
    }

    let mut bytes = Vec::with_capacity(token.len() / 2);
    for pair in token.as_bytes().chunks(2) {
        let hex = std::str::from_utf8(pair)
            .map_err(|_| DecodeError::Malformed(format!("token {token:?} is not valid hex")))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|_| DecodeError::Malformed(format!("token {token:?} is not valid hex")))?;
        bytes.push(byte);
    }

    let plain = String::from_utf8(bytes)
        .map_err(|_| DecodeError::Malformed(format!("token {token:?} decodes to non-UTF-8")))?;

    let Some((course, user)) = plain.split_once('-') else {
        return Err(DecodeError::Malformed(format!(
            "token {token:?} has no course/user separator"
        )));
    };

    Ok(DecodedIdentifier {
        course_id: parse_id(course, token)?,
        user_id: parse_id(user, token)?,
    })
}

/// Parse one side of the separator as a non-negative integer id.
fn parse_id(part: &str, token: &str) -> Result<i64, DecodeError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::Malformed(format!(
            "token {token:?} has a non-numeric id part"
        )));
    }
    part.parse::<i64>()
        .map_err(|_| DecodeError::Malformed(format!("token {token:?} has an id out of range")))
}
