//! Decryption of the secret embedded in the token payload.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::services::token::{
    cipher::SymmetricCipher,
    error::ValidationError,
    types::{Assertions, Payload, TokenType},
};

const FIELD_TOKEN_TYPE: &str = "tokenType";
const FIELD_CONTEXT: &str = "context";
const FIELD_ASSERTIONS: &str = "assertions";

/// Decrypted secret document.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedSecret(Value);

impl DecryptedSecret {
    /// Authoritative token type. Blank, missing or unknown names are unusable.
    pub fn token_type(&self) -> Result<TokenType, ValidationError> {
        let name = self
            .0
            .get(FIELD_TOKEN_TYPE)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingTokenType)?;

        name.parse().map_err(|_| ValidationError::MissingTokenType)
    }

    /// Verification context (key owner). Required for signature checks.
    pub fn context(&self) -> Result<&str, ValidationError> {
        self.0
            .get(FIELD_CONTEXT)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                warn!("verification context is missing from decrypted secret");
                ValidationError::decryption("verification context cannot be empty")
            })
    }

    /// Caller assertions; absent or non-object means none.
    pub fn assertions(&self) -> Assertions {
        match self.0.get(FIELD_ASSERTIONS) {
            Some(Value::Object(map)) => map.clone(),
            _ => Assertions::new(),
        }
    }
}

#[derive(Clone)]
pub struct PayloadDecryptor {
    cipher: Arc<dyn SymmetricCipher>,
}

impl std::fmt::Debug for PayloadDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadDecryptor").finish_non_exhaustive()
    }
}

impl PayloadDecryptor {
    pub fn new(cipher: Arc<dyn SymmetricCipher>) -> Self {
        Self { cipher }
    }

    pub fn decrypt(&self, payload: &Payload) -> Result<DecryptedSecret, ValidationError> {
        let secret = payload
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ValidationError::decryption("secret should be present in payload"))?;

        let plaintext = self.cipher.decrypt(secret).map_err(|e| {
            warn!(error = %e, "cannot decrypt given secret");
            ValidationError::decryption(e.to_string())
        })?;

        let doc: Value = serde_json::from_str(&plaintext)
            .map_err(|e| ValidationError::decryption(format!("secret is not json: {e}")))?;

        if !doc.is_object() {
            return Err(ValidationError::decryption("secret is not a json object"));
        }
        Ok(DecryptedSecret(doc))
    }

    pub fn extract_token_type(&self, payload: &Payload) -> Result<TokenType, ValidationError> {
        self.decrypt(payload)?.token_type()
    }

    pub fn extract_assertions(&self, payload: &Payload) -> Result<Assertions, ValidationError> {
        Ok(self.decrypt(payload)?.assertions())
    }
}
