//! Token segment handling.
//!
//! A token is `<b64url(header)>.<b64url(payload)>.<b64url(signature)>`. Nothing
//! here verifies anything; it only takes the string apart.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::services::token::{error::ValidationError, types::Payload};

pub const SEGMENT_COUNT: usize = 3;

/// The three parts of a token, borrowed from the raw string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segments<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

pub fn split(token: &str) -> Result<Segments<'_>, ValidationError> {
    let parts: Vec<&str> = token.split('.').collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok(Segments {
            header,
            payload,
            signature,
        }),
        _ => Err(ValidationError::malformed(format!(
            "expected {SEGMENT_COUNT} segments, found {}",
            parts.len()
        ))),
    }
}

/// Base64-decodes the payload segment.
///
/// Url-safe alphabet without padding only, same as the signature check.
pub fn decode_payload(token: &str) -> Result<Vec<u8>, ValidationError> {
    let segments = split(token)?;
    decode_segment(segments.payload)
        .map_err(|e| ValidationError::malformed(format!("payload is not base64: {e}")))
}

pub fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(segment)
}

pub fn parse_payload(token: &str) -> Result<Payload, ValidationError> {
    let bytes = decode_payload(token)?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::malformed(format!("payload is not valid json: {e}")))
}

const SCRAMBLED: &str = "{ token is scrambled }";

/// Log-safe rendering of a token: 9 leading chars, `...`, 10 trailing chars.
pub fn obfuscate(token: &str) -> String {
    if token.len() <= 19 {
        return SCRAMBLED.to_string();
    }
    match (token.get(..9), token.get(token.len() - 10..)) {
        (Some(head), Some(tail)) => format!("{head}...{tail}"),
        _ => SCRAMBLED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::token::error::ErrorKind;

    fn b64(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json)
    }

    #[test]
    fn splits_three_segments() {
        let s = split("a.b.c").unwrap();
        assert_eq!((s.header, s.payload, s.signature), ("a", "b", "c"));
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        for token in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e"] {
            let err = split(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedToken, "token {token:?}");
        }
    }

    #[test]
    fn payload_must_be_unpadded_url_safe() {
        let json = r#"{"dateCreated":1,"x":"??>>"}"#;
        let url = format!("h.{}.s", URL_SAFE_NO_PAD.encode(json));
        assert_eq!(decode_payload(&url).unwrap(), json.as_bytes());

        let padded = format!("h.{}.s", base64::engine::general_purpose::URL_SAFE.encode(json));
        let standard = format!("h.{}.s", base64::engine::general_purpose::STANDARD.encode(json));
        for token in [padded.as_str(), standard.as_str(), "h.ab+/.s"] {
            let err = decode_payload(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedToken, "{token}");
        }
    }

    #[test]
    fn undecodable_payload_is_malformed() {
        let err = decode_payload("h.%%%%.s").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedToken);

        let token = format!("h.{}.s", b64("not json"));
        assert_eq!(
            parse_payload(&token).unwrap_err().kind(),
            ErrorKind::MalformedToken
        );
    }

    #[test]
    fn obfuscate_hides_the_middle() {
        let token = "eyJhbGciOi.MIDDLE-SECRET-PART.0123456789";
        let shown = obfuscate(token);
        assert_eq!(shown, "eyJhbGciO...0123456789");
        assert!(!shown.contains("SECRET"));
        assert_eq!(obfuscate("short.token"), SCRAMBLED);
    }
}
