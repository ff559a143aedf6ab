//! Shared fixtures for unit tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use ed25519_dalek::SigningKey;

use crate::services::keys::fetcher::{KeyFetchError, KeyFetcher};
use crate::services::token::{ChaChaCipher, TokenClaims, TokenIssuer, TokenType};

pub const CONTEXT: &str = "svc-a";
pub const CIPHER_KEY: [u8; 32] = [42u8; 32];

pub fn cipher() -> Arc<ChaChaCipher> {
    Arc::new(ChaChaCipher::new(&CIPHER_KEY))
}

/// Issuer whose signing key is derived from `seed`.
pub fn issuer(seed: u8) -> TokenIssuer {
    TokenIssuer::new(SigningKey::from_bytes(&[seed; 32]), cipher())
}

pub fn session_claims(created_ms: i64) -> TokenClaims {
    TokenClaims::new(TokenType::Session, CONTEXT, created_ms).expires_in(60_000)
}

/// Key service double that counts fetches.
#[derive(Debug, Default)]
pub struct MemoryKeyFetcher {
    keys: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
    hang: bool,
}

impl MemoryKeyFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn set(&self, key_path: &str, key: String) {
        self.keys.lock().unwrap().insert(key_path.to_string(), key);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyFetcher for MemoryKeyFetcher {
    async fn fetch(&self, key_path: &str) -> Result<String, KeyFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.keys
            .lock()
            .unwrap()
            .get(key_path)
            .cloned()
            .ok_or(KeyFetchError::Status(404))
    }
}
