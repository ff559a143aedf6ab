//! Remote key service client.
//!
//! `GET <context>/pubkey` answers `{"key": "<base64 public key>"}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum KeyFetchError {
    #[error("key path {0:?} is not an absolute url and no key service base url is configured")]
    NoBaseUrl(String),
    #[error("invalid key url: {0}")]
    Url(#[from] url::ParseError),
    #[error("key service timed out after {0:?}")]
    Timeout(Duration),
    #[error("key service request failed: {0}")]
    Transport(String),
    #[error("key service returned status {0}")]
    Status(u16),
    #[error("key service response has no key")]
    EmptyKey,
}

/// Source of truth for public keys.
#[async_trait]
pub trait KeyFetcher: Send + Sync + 'static {
    async fn fetch(&self, key_path: &str) -> Result<String, KeyFetchError>;
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    #[serde(default)]
    key: Option<String>,
}

/// reqwest-backed fetcher with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    client: Client,
    base_url: Option<Url>,
    timeout: Duration,
}

impl HttpKeyFetcher {
    pub fn new(base_url: Option<Url>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("token-guard/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        // Url::join drops the last segment unless the base ends with '/'
        let base_url = base_url.map(|mut url| {
            if !url.path().ends_with('/') {
                let path = format!("{}/", url.path());
                url.set_path(&path);
            }
            url
        });

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Absolute key paths are used as-is; relative ones hang off the base url.
    pub fn resolve(&self, key_path: &str) -> Result<Url, KeyFetchError> {
        if let Ok(url) = Url::parse(key_path) {
            if url.has_host() {
                return Ok(url);
            }
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| KeyFetchError::NoBaseUrl(key_path.to_string()))?;
        Ok(base.join(key_path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, key_path: &str) -> Result<String, KeyFetchError> {
        let url = self.resolve(key_path)?;
        debug!(key.url = %url, "fetching public key");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                KeyFetchError::Timeout(self.timeout)
            } else {
                KeyFetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(key.url = %url, http.status_code = status.as_u16(), "key service returned an error");
            return Err(KeyFetchError::Status(status.as_u16()));
        }

        let body: KeyResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                KeyFetchError::Timeout(self.timeout)
            } else {
                KeyFetchError::Transport(e.to_string())
            }
        })?;

        body.key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(KeyFetchError::EmptyKey)
    }
}
