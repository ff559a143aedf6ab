use std::fmt;

use thiserror::Error;

use crate::services::token::types::{AllowedTokenTypes, TokenType};

/// Stable classification of a rejected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingAuthHeader,
    MalformedToken,
    ExpiredToken,
    DecryptionFailure,
    MissingTokenType,
    TokenTypeMismatch,
    SignatureVerificationFailure,
    AssertionFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingAuthHeader => "missing_auth_header",
            Self::MalformedToken => "malformed_token",
            Self::ExpiredToken => "expired_token",
            Self::DecryptionFailure => "decryption_failure",
            Self::MissingTokenType => "missing_token_type",
            Self::TokenTypeMismatch => "token_type_mismatch",
            Self::SignatureVerificationFailure => "signature_verification_failure",
            Self::AssertionFailure => "assertion_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request failed token validation.
///
/// The message is for logs only; callers answer every variant with the same
/// rejection.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("authorization header is missing or empty")]
    MissingAuthHeader,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token expired: {age_ms}ms old, lifetime {expiry_ms}ms")]
    ExpiredToken { age_ms: i64, expiry_ms: i64 },

    #[error("cannot decrypt token secret: {0}")]
    DecryptionFailure(String),

    #[error("token type not specified")]
    MissingTokenType,

    #[error("allowed token types are {allowed} but got {actual}")]
    TokenTypeMismatch {
        allowed: AllowedTokenTypes,
        actual: TokenType,
    },

    #[error("unable to verify {token_type} token signature: {source}")]
    SignatureVerificationFailure {
        token_type: TokenType,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("assertion checks rejected the request")]
    AssertionFailure,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingAuthHeader => ErrorKind::MissingAuthHeader,
            Self::MalformedToken(_) => ErrorKind::MalformedToken,
            Self::ExpiredToken { .. } => ErrorKind::ExpiredToken,
            Self::DecryptionFailure(_) => ErrorKind::DecryptionFailure,
            Self::MissingTokenType => ErrorKind::MissingTokenType,
            Self::TokenTypeMismatch { .. } => ErrorKind::TokenTypeMismatch,
            Self::SignatureVerificationFailure { .. } => ErrorKind::SignatureVerificationFailure,
            Self::AssertionFailure => ErrorKind::AssertionFailure,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken(message.into())
    }

    pub fn decryption(message: impl Into<String>) -> Self {
        Self::DecryptionFailure(message.into())
    }
}
