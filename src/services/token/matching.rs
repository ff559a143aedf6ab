use tracing::warn;

use crate::services::token::{
    error::ValidationError,
    types::{AllowedTokenTypes, TokenType},
};

/// Passes when `actual` is a non-NONE member of `allowed`.
pub fn check_token_type(
    allowed: &AllowedTokenTypes,
    actual: TokenType,
) -> Result<(), ValidationError> {
    if allowed.permits(actual) {
        return Ok(());
    }
    warn!(allowed = %allowed, actual = %actual, "token type not allowed for route");
    Err(ValidationError::TokenTypeMismatch {
        allowed: allowed.clone(),
        actual,
    })
}
