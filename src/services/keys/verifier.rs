//! Token signature verification backed by the key cache.
//!
//! One routine serves every token type; the type only labels logs and errors.
//! A failure with the cached key triggers exactly one authoritative re-fetch
//! and retry, which heals key rotation without an invalidation signal.

use std::{sync::Arc, time::Duration};

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;
use tracing::{debug, warn};

use crate::services::keys::{
    cache::PublicKeyCache,
    fetcher::{KeyFetchError, KeyFetcher},
};
use crate::services::token::{codec::obfuscate, error::ValidationError, types::TokenType};

pub const PUBKEY_PATH_SUFFIX: &str = "/pubkey";

pub fn key_path(context: &str) -> String {
    format!("{context}{PUBKEY_PATH_SUFFIX}")
}

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("no signature verifier for {0} tokens")]
    UnsupportedType(TokenType),
    #[error(transparent)]
    Fetch(#[from] KeyFetchError),
    #[error("public key is unusable: {0}")]
    Key(String),
    #[error("signature does not verify: {0}")]
    Signature(#[from] jsonwebtoken::errors::Error),
}

pub struct SignatureVerifier {
    cache: Arc<PublicKeyCache>,
    fetcher: Arc<dyn KeyFetcher>,
    fetch_timeout: Duration,
    validation: Validation,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("cached_keys", &self.cache.len())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(
        cache: Arc<PublicKeyCache>,
        fetcher: Arc<dyn KeyFetcher>,
        fetch_timeout: Duration,
    ) -> Self {
        // Only the signature is checked here. Expiry has its own stage and the
        // payload carries no registered claims.
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            cache,
            fetcher,
            fetch_timeout,
            validation,
        }
    }

    pub fn cache(&self) -> &PublicKeyCache {
        &self.cache
    }

    pub async fn verify(
        &self,
        token_type: TokenType,
        token: &str,
        context: &str,
    ) -> Result<(), ValidationError> {
        let failure = |source: SignatureError| ValidationError::SignatureVerificationFailure {
            token_type,
            source: Box::new(source),
        };

        if token_type == TokenType::None {
            return Err(failure(SignatureError::UnsupportedType(token_type)));
        }

        let path = key_path(context);

        let first = match self.cached_or_fetched(&path).await {
            Ok(key) => self.verify_with(token, &key),
            Err(e) => Err(e),
        };
        let Err(cause) = first else {
            debug!(token_type = %token_type, token = %obfuscate(token), context, "validated token integrity");
            return Ok(());
        };
        debug!(
            token_type = %token_type,
            error = %cause,
            "unable to verify token with cached key, fetching a fresh one"
        );

        let key = self.fetch_remote(&path).await.map_err(|e| {
            warn!(token_type = %token_type, error = %e, "unable to verify token");
            failure(e)
        })?;
        self.cache.put(path.as_str(), key.as_str());

        self.verify_with(token, &key).map_err(|e| {
            warn!(token_type = %token_type, error = %e, "unable to verify token");
            failure(e)
        })?;

        debug!(token_type = %token_type, token = %obfuscate(token), context, "validated token integrity after key refresh");
        Ok(())
    }

    async fn cached_or_fetched(&self, path: &str) -> Result<String, SignatureError> {
        if let Some(key) = self.cache.get(path) {
            return Ok(key);
        }
        let key = self.fetch_remote(path).await?;
        self.cache.put(path, key.as_str());
        Ok(key)
    }

    async fn fetch_remote(&self, path: &str) -> Result<String, SignatureError> {
        match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(path)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(KeyFetchError::Timeout(self.fetch_timeout).into()),
        }
    }

    fn verify_with(&self, token: &str, key: &str) -> Result<(), SignatureError> {
        let decoding_key = decoding_key(key)?;
        jsonwebtoken::decode::<serde_json::Value>(token, &decoding_key, &self.validation)?;
        Ok(())
    }
}

/// Accepts a PEM (SPKI) document or base64 of the raw 32-byte Ed25519 key.
pub fn decoding_key(key: &str) -> Result<DecodingKey, SignatureError> {
    let key = key.trim();
    if key.starts_with("-----BEGIN") {
        return DecodingKey::from_ed_pem(key.as_bytes())
            .map_err(|e| SignatureError::Key(e.to_string()));
    }

    let raw = STANDARD
        .decode(key)
        .or_else(|_| URL_SAFE_NO_PAD.decode(key.trim_end_matches('=')))
        .map_err(|_| SignatureError::Key("not base64".to_string()))?;
    if raw.len() != 32 {
        return Err(SignatureError::Key(format!(
            "expected 32 key bytes, got {}",
            raw.len()
        )));
    }
    Ok(DecodingKey::from_ed_der(&raw))
}
