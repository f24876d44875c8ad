//! Unverified inspection of the access token payload.
//!
//! The signature is never checked here: the issue time only feeds the
//! refresh-timing heuristic, and the backend remains the authority on
//! whether a token is valid.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde_json::Value;

/// Reasons a token payload could not be inspected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("expected 3 dot-separated segments, found {0}")]
    SegmentCount(usize),
    #[error("payload segment is not valid base64")]
    Encoding,
    #[error("payload is not valid JSON")]
    Payload,
    #[error("payload has no numeric iat claim")]
    MissingIssuedAt,
}

/// Read the `iat` claim (seconds since epoch) from a three-segment token.
pub fn issued_at(token: &str) -> Result<u64, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::SegmentCount(segments.len()));
    }

    let payload = decode_segment(segments[1])?;
    let claims: Value = serde_json::from_slice(&payload).map_err(|_| TokenError::Payload)?;

    let iat = claims.get("iat").ok_or(TokenError::MissingIssuedAt)?;
    iat.as_u64()
        .or_else(|| {
            iat.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or(TokenError::MissingIssuedAt)
}

// Tokens use the URL-safe alphabet, but some issuers emit standard base64.
fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|_| TokenError::Encoding)
}
