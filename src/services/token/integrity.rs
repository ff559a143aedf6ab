//! Structural and time checks that run before any cryptography.
//!
//! Stages run in order and stop at the first failure:
//! header presence -> segment count -> expiry.

use tracing::debug;

use crate::services::token::{codec, error::ValidationError, types::Payload};

/// A token that passed every integrity stage.
#[derive(Debug, Clone)]
pub struct CheckedToken<'a> {
    pub token: &'a str,
    pub payload: Payload,
}

/// Runs every integrity stage in order.
pub fn check(authorization: Option<&str>, now_ms: i64) -> Result<CheckedToken<'_>, ValidationError> {
    let token = has_auth_header(authorization)?;
    has_three_segments(token)?;
    let payload = codec::parse_payload(token)?;
    is_not_expired(&payload, now_ms)?;
    Ok(CheckedToken { token, payload })
}

pub fn has_auth_header(authorization: Option<&str>) -> Result<&str, ValidationError> {
    match authorization {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::MissingAuthHeader),
    }
}

pub fn has_three_segments(token: &str) -> Result<(), ValidationError> {
    codec::split(token).map(|_| ())
}

pub fn is_not_expired(payload: &Payload, now_ms: i64) -> Result<(), ValidationError> {
    let created = payload.date_created;
    let expiry = payload.expiry_in_milli_seconds;

    if is_expired(created, expiry, now_ms) {
        return Err(ValidationError::ExpiredToken {
            age_ms: now_ms.saturating_sub(created),
            expiry_ms: expiry,
        });
    }
    debug!(date_created = created, expiry_ms = expiry, "token is within its lifetime");
    Ok(())
}

/// A negative expiry never expires. A creation time in the future is not
/// treated as expired either.
pub fn is_expired(created_ms: i64, expiry_ms: i64, now_ms: i64) -> bool {
    if expiry_ms < 0 {
        return false;
    }
    if created_ms > now_ms {
        return false;
    }
    now_ms.saturating_sub(created_ms) > expiry_ms
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::*;
    use crate::services::token::{error::ErrorKind, types::EXPIRY_NEVER};

    const T: i64 = 1_700_000_000_000;

    fn token_with(created: i64, expiry: i64) -> String {
        let payload = serde_json::json!({
            "dateCreated": created,
            "expiryInMilliSeconds": expiry,
            "secret": "irrelevant",
        });
        format!(
            "aGVhZGVy.{}.c2ln",
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    #[test]
    fn missing_or_blank_header_is_rejected_first() {
        assert_eq!(
            check(None, T).unwrap_err().kind(),
            ErrorKind::MissingAuthHeader
        );
        assert_eq!(
            check(Some("  "), T).unwrap_err().kind(),
            ErrorKind::MissingAuthHeader
        );
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        for token in ["abc", "a.b", "a.b.c.d"] {
            assert_eq!(
                check(Some(token), T).unwrap_err().kind(),
                ErrorKind::MalformedToken
            );
        }
    }

    #[test]
    fn negative_expiry_never_expires() {
        for expiry in [EXPIRY_NEVER, -2, -60_000, i64::MIN] {
            assert!(!is_expired(0, expiry, T));
            assert!(check(Some(&token_with(0, expiry)), T).is_ok());
        }
    }

    #[test]
    fn elapsed_lifetime_is_expired() {
        let err = check(Some(&token_with(T - 90_000, 60_000)), T).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpiredToken);
        assert!(is_expired(T - 60_001, 60_000, T));
    }

    #[test]
    fn boundary_is_still_valid() {
        assert!(!is_expired(T - 60_000, 60_000, T));
        assert!(!is_expired(T, 0, T));
        assert!(check(Some(&token_with(T - 30_000, 60_000)), T).is_ok());
    }

    #[test]
    fn future_creation_time_passes() {
        assert!(!is_expired(T + 10_000, 0, T));
        assert!(check(Some(&token_with(T + 10_000, 1)), T).is_ok());
    }
}
