//! Token minting in the wire format this service validates.
//!
//! Used by the `token-gen` tool and by tests. The signature is Ed25519 over
//! `base64url(header).base64url(payload)`, the secret is sealed with the shared
//! symmetric cipher.

use std::sync::Arc;

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signer, SigningKey, pkcs8::DecodePrivateKey};
use serde_json::json;
use thiserror::Error;

use crate::services::token::{
    cipher::{CipherError, SymmetricCipher},
    types::{Assertions, Payload, TokenType},
};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("invalid signing key: {0}")]
    SigningKey(String),
    #[error("cannot seal secret: {0}")]
    Cipher(#[from] CipherError),
    #[error("cannot serialize token: {0}")]
    Json(#[from] serde_json::Error),
}

/// What goes into a token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub token_type: TokenType,
    pub context: String,
    pub assertions: Assertions,
    pub date_created_ms: i64,
    pub expiry_ms: i64,
}

impl TokenClaims {
    pub fn new(token_type: TokenType, context: impl Into<String>, date_created_ms: i64) -> Self {
        Self {
            token_type,
            context: context.into(),
            assertions: Assertions::new(),
            date_created_ms,
            expiry_ms: crate::services::token::types::EXPIRY_NEVER,
        }
    }

    pub fn expires_in(mut self, expiry_ms: i64) -> Self {
        self.expiry_ms = expiry_ms;
        self
    }

    pub fn assert(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.assertions.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    signing_key: SigningKey,
    cipher: Arc<dyn SymmetricCipher>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenIssuer")
            .field("public_key", &self.public_key_base64())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(signing_key: SigningKey, cipher: Arc<dyn SymmetricCipher>) -> Self {
        Self {
            signing_key,
            cipher,
        }
    }

    /// `pem` must be an Ed25519 private key in PKCS#8 PEM format.
    pub fn from_pkcs8_pem(pem: &str, cipher: Arc<dyn SymmetricCipher>) -> Result<Self, IssueError> {
        let signing_key =
            SigningKey::from_pkcs8_pem(pem).map_err(|e| IssueError::SigningKey(e.to_string()))?;
        Ok(Self::new(signing_key, cipher))
    }

    /// Public key as served by the key service (`{"key": ...}`).
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.signing_key.verifying_key().as_bytes())
    }

    pub fn issue(&self, claims: &TokenClaims) -> Result<String, IssueError> {
        let secret_doc = json!({
            "tokenType": claims.token_type,
            "context": claims.context,
            "assertions": claims.assertions,
        });
        let secret = self.cipher.encrypt(&secret_doc.to_string())?;

        let payload = Payload {
            token_type: Some(claims.token_type.to_string()),
            context: Some(claims.context.clone()),
            date_created: claims.date_created_ms,
            expiry_in_milli_seconds: claims.expiry_ms,
            secret: Some(secret),
        };

        let header = json!({ "alg": "EdDSA", "typ": "JWT" });
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?)
        );

        let signature = self.signing_key.sign(signing_input.as_bytes());
        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}
