pub mod cache;
pub mod fetcher;
pub mod verifier;

pub use cache::PublicKeyCache;
pub use fetcher::{HttpKeyFetcher, KeyFetchError, KeyFetcher};
pub use verifier::SignatureVerifier;
