//! Symmetric cipher shared with the token issuer.
//!
//! Wire format of an encrypted secret: `base64url(nonce[12] || ciphertext+tag)`
//! using ChaCha20-Poly1305. The key is provisioned out of band.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;
pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid key material: expected {KEY_LEN} bytes as hex, base64 or raw text")]
    InvalidKey,
    #[error("ciphertext is not valid base64")]
    Encoding,
    #[error("ciphertext is too short")]
    Truncated,
    #[error("authentication failed")]
    Aead,
    #[error("plaintext is not utf-8")]
    Utf8,
}

pub trait SymmetricCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

#[derive(Clone)]
pub struct ChaChaCipher {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for ChaChaCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("ChaChaCipher").finish_non_exhaustive()
    }
}

impl ChaChaCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    pub fn from_key_material(raw: &str) -> Result<Self, CipherError> {
        parse_key_material(raw)
            .map(|key| Self::new(&key))
            .ok_or(CipherError::InvalidKey)
    }
}

impl SymmetricCipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| CipherError::Aead)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let raw = URL_SAFE_NO_PAD
            .decode(ciphertext.trim())
            .map_err(|_| CipherError::Encoding)?;
        if raw.len() <= NONCE_LEN {
            return Err(CipherError::Truncated);
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Aead)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Utf8)
    }
}

/// Accepts 64 hex chars, base64url or base64 of 32 bytes, or 32 raw bytes.
pub fn parse_key_material(raw: &str) -> Option<[u8; KEY_LEN]> {
    let trimmed = raw.trim();

    if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(trimmed).ok()?.try_into().ok();
    }

    for decoded in [
        URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')),
        STANDARD.decode(trimmed),
    ] {
        if let Ok(bytes) = decoded {
            if let Ok(key) = <[u8; KEY_LEN]>::try_from(bytes) {
                return Some(key);
            }
        }
    }

    trimmed.as_bytes().try_into().ok()
}
