//! In-process public key cache.
//!
//! Keyed by key path (`<context>/pubkey`). Entries live for the whole process
//! and are only ever overwritten; stale keys are healed by the verifier's
//! re-fetch, not by expiry.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

#[derive(Debug, Default)]
pub struct PublicKeyCache {
    entries: RwLock<HashMap<String, String>>,
}

impl PublicKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key_path: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key_path)
            .cloned()
    }

    /// Last write wins.
    pub fn put(&self, key_path: impl Into<String>, key: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key_path.into(), key.into());
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
