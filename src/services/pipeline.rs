//! Request validation pipeline.
//!
//! policy -> integrity -> decrypt -> type match -> signature -> assertions.
//! Each stage returns `Result` and the first error stops the run.

use std::sync::Arc;

use tracing::debug;

use crate::services::{
    assertion::AssertionChain,
    keys::SignatureVerifier,
    policy::{PolicyResolver, RoutePolicy},
    request::RequestView,
    token::{
        Assertions, PayloadDecryptor, TokenType, ValidationError, integrity, matching,
    },
};

/// Identity established by a successfully validated token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedToken {
    pub token_type: TokenType,
    pub context: String,
    pub assertions: Assertions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The route needs no token; nothing was checked.
    Exempt,
    Authorized(VerifiedToken),
}

pub struct RequestValidator {
    decryptor: PayloadDecryptor,
    verifier: SignatureVerifier,
    policies: Arc<dyn PolicyResolver>,
    assertions: AssertionChain,
}

impl std::fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidator")
            .field("verifier", &self.verifier)
            .field("assertions", &self.assertions)
            .finish_non_exhaustive()
    }
}

impl RequestValidator {
    pub fn new(
        decryptor: PayloadDecryptor,
        verifier: SignatureVerifier,
        policies: Arc<dyn PolicyResolver>,
        assertions: AssertionChain,
    ) -> Self {
        Self {
            decryptor,
            verifier,
            policies,
            assertions,
        }
    }

    pub async fn validate(&self, request: &RequestView<'_>) -> Result<Outcome, ValidationError> {
        self.validate_at(request, chrono::Utc::now().timestamp_millis())
            .await
    }

    pub async fn validate_at(
        &self,
        request: &RequestView<'_>,
        now_ms: i64,
    ) -> Result<Outcome, ValidationError> {
        // Requests that matched no route (assets, 404s) are not gated.
        let Some(route) = request.route else {
            debug!(uri = %request.uri, "request matched no route, no token required");
            return Ok(Outcome::Exempt);
        };

        let allowed = match self.policies.resolve(request.method, route) {
            RoutePolicy::Exempt => {
                debug!(route, "route is exempt, no token required");
                return Ok(Outcome::Exempt);
            }
            RoutePolicy::Secured(allowed) => allowed,
        };

        let checked = integrity::check(request.authorization(), now_ms)?;

        let secret = self.decryptor.decrypt(&checked.payload)?;
        let token_type = secret.token_type()?;
        let assertions = secret.assertions();

        matching::check_token_type(&allowed, token_type)?;

        let context = secret.context()?;
        self.verifier
            .verify(token_type, checked.token, context)
            .await?;

        if !self
            .assertions
            .validate(&allowed, token_type, &assertions, request)
        {
            return Err(ValidationError::AssertionFailure);
        }

        Ok(Outcome::Authorized(VerifiedToken {
            token_type,
            context: context.to_string(),
            assertions,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use axum::http::{HeaderMap, HeaderValue, Method, Uri, header};
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde_json::json;

    use super::*;
    use crate::services::{
        assertion::PathParamBinding,
        keys::{PublicKeyCache, verifier::key_path},
        policy::PolicyTable,
        token::{
            ChaChaCipher, ErrorKind, SymmetricCipher, TokenClaims, TokenIssuer,
            cipher::CipherError,
        },
    };
    use crate::test_support::{CONTEXT, MemoryKeyFetcher, cipher, issuer, session_claims};

    const T: i64 = 1_700_000_000_000;
    const ROUTE: &str = "/api/v1/sessions/current";

    /// Counts decrypt calls so tests can prove no decryption happened.
    struct CountingCipher {
        inner: ChaChaCipher,
        decrypts: AtomicUsize,
    }

    impl SymmetricCipher for CountingCipher {
        fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
            self.inner.encrypt(plaintext)
        }

        fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
            self.decrypts.fetch_add(1, Ordering::SeqCst);
            self.inner.decrypt(ciphertext)
        }
    }

    struct Harness {
        validator: RequestValidator,
        fetcher: Arc<MemoryKeyFetcher>,
        cache: Arc<PublicKeyCache>,
        cipher: Arc<CountingCipher>,
        issuer: TokenIssuer,
    }

    fn harness(chain: AssertionChain) -> Harness {
        let issuer = issuer(1);
        let cipher = Arc::new(CountingCipher {
            inner: ChaChaCipher::new(&crate::test_support::CIPHER_KEY),
            decrypts: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(MemoryKeyFetcher::new());
        fetcher.set(&key_path(CONTEXT), issuer.public_key_base64());
        let cache = Arc::new(PublicKeyCache::new());
        cache.put(key_path(CONTEXT), issuer.public_key_base64());

        let policies = PolicyTable::new(RoutePolicy::deny())
            .exempt(Method::GET, "/health")
            .secure(Method::GET, ROUTE, [TokenType::Session])
            .secure(
                Method::GET,
                "/api/v1/tenants/{tenant_id}/profile",
                [TokenType::Session, TokenType::Server],
            );

        let validator = RequestValidator::new(
            PayloadDecryptor::new(cipher.clone()),
            SignatureVerifier::new(cache.clone(), fetcher.clone(), Duration::from_millis(200)),
            Arc::new(policies),
            chain,
        );

        Harness {
            validator,
            fetcher,
            cache,
            cipher,
            issuer,
        }
    }

    async fn run(
        h: &Harness,
        route: Option<&str>,
        token: Option<&str>,
        params: &[(String, String)],
        now: i64,
    ) -> Result<Outcome, ValidationError> {
        let method = Method::GET;
        let uri: Uri = "/anything".parse().unwrap();
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(token).unwrap());
        }
        let view = RequestView {
            method: &method,
            uri: &uri,
            headers: &headers,
            route,
            path_params: params,
        };
        h.validator.validate_at(&view, now).await
    }

    #[tokio::test]
    async fn valid_session_token_is_authorized() {
        let h = harness(AssertionChain::new());
        let token = h.issuer.issue(&session_claims(T)).unwrap();

        let outcome = run(&h, Some(ROUTE), Some(&token), &[], T + 30_000)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Authorized(VerifiedToken {
                token_type: TokenType::Session,
                context: CONTEXT.to_string(),
                assertions: Assertions::new(),
            })
        );
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_is_rejected_before_decryption_or_signature_work() {
        let h = harness(AssertionChain::new());
        let token = h.issuer.issue(&session_claims(T)).unwrap();

        let err = run(&h, Some(ROUTE), Some(&token), &[], T + 90_000)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExpiredToken);
        assert_eq!(h.cipher.decrypts.load(Ordering::SeqCst), 0);
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn hand_built_token_with_foreign_header_is_verified() {
        // payload carries only the time fields and the secret
        let h = harness(AssertionChain::new());
        let secret = cipher()
            .encrypt(r#"{"tokenType":"SESSION","context":"svc-a"}"#)
            .unwrap();
        let payload = json!({
            "dateCreated": T,
            "expiryInMilliSeconds": 60_000,
            "secret": secret,
        });
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{header}.{body}");

        use ed25519_dalek::{Signer, SigningKey};
        let signature = SigningKey::from_bytes(&[1u8; 32]).sign(signing_input.as_bytes());
        let token = format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        );

        let outcome = run(&h, Some(ROUTE), Some(&token), &[], T + 30_000).await;
        assert!(matches!(outcome, Ok(Outcome::Authorized(_))));
    }

    #[tokio::test]
    async fn exempt_and_unmatched_routes_need_no_token() {
        let h = harness(AssertionChain::new());
        assert_eq!(
            run(&h, Some("/health"), None, &[], T).await.unwrap(),
            Outcome::Exempt
        );
        assert_eq!(
            run(&h, None, Some("garbage"), &[], T).await.unwrap(),
            Outcome::Exempt
        );
    }

    #[tokio::test]
    async fn unregistered_route_falls_back_to_deny() {
        let h = harness(AssertionChain::new());
        let token = h.issuer.issue(&session_claims(T)).unwrap();
        let err = run(&h, Some("/api/v1/unlisted"), Some(&token), &[], T)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenTypeMismatch);
    }

    #[tokio::test]
    async fn structural_failures_map_to_their_kinds() {
        let h = harness(AssertionChain::new());
        assert_eq!(
            run(&h, Some(ROUTE), None, &[], T).await.unwrap_err().kind(),
            ErrorKind::MissingAuthHeader
        );
        assert_eq!(
            run(&h, Some(ROUTE), Some("a.b"), &[], T)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedToken
        );
        // the scheme is not stripped, so the header segment no longer verifies
        let token = h.issuer.issue(&session_claims(T)).unwrap();
        assert_eq!(
            run(&h, Some(ROUTE), Some(&format!("Bearer {token}")), &[], T)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::SignatureVerificationFailure
        );
    }

    #[tokio::test]
    async fn wrong_type_is_rejected_before_signature_work() {
        let h = harness(AssertionChain::new());
        let token = h
            .issuer
            .issue(&TokenClaims::new(TokenType::Client, CONTEXT, T))
            .unwrap();
        let err = run(&h, Some(ROUTE), Some(&token), &[], T)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenTypeMismatch);
        assert_eq!(h.fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn none_type_is_never_authorized() {
        let h = harness(AssertionChain::new());
        let token = h
            .issuer
            .issue(&TokenClaims::new(TokenType::None, CONTEXT, T))
            .unwrap();
        let err = run(&h, Some(ROUTE), Some(&token), &[], T)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenTypeMismatch);
    }

    #[tokio::test]
    async fn token_from_a_different_cipher_key_fails_decryption() {
        let h = harness(AssertionChain::new());
        let foreign = TokenIssuer::new(
            ed25519_dalek::SigningKey::from_bytes(&[1u8; 32]),
            Arc::new(ChaChaCipher::new(&[0u8; 32])),
        );
        let token = foreign.issue(&session_claims(T)).unwrap();
        let err = run(&h, Some(ROUTE), Some(&token), &[], T)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailure);
    }

    #[tokio::test]
    async fn rotated_key_is_picked_up() {
        let h = harness(AssertionChain::new());
        let rotated = issuer(7);
        h.fetcher
            .set(&key_path(CONTEXT), rotated.public_key_base64());

        let token = rotated.issue(&session_claims(T)).unwrap();
        let outcome = run(&h, Some(ROUTE), Some(&token), &[], T).await.unwrap();

        assert!(matches!(outcome, Outcome::Authorized(_)));
        assert_eq!(h.fetcher.calls(), 1);
        assert_eq!(
            h.cache.get(&key_path(CONTEXT)),
            Some(rotated.public_key_base64())
        );
    }

    #[tokio::test]
    async fn assertion_chain_gates_the_result() {
        let h = harness(AssertionChain::new().with(PathParamBinding::new("tenant", "tenant_id")));
        let route = "/api/v1/tenants/{tenant_id}/profile";
        let token = h
            .issuer
            .issue(&session_claims(T).assert("tenant", "acme"))
            .unwrap();

        let acme = vec![("tenant_id".to_string(), "acme".to_string())];
        let outcome = run(&h, Some(route), Some(&token), &acme, T).await.unwrap();
        match outcome {
            Outcome::Authorized(v) => assert_eq!(v.assertions["tenant"], json!("acme")),
            other => panic!("unexpected outcome {other:?}"),
        }

        let globex = vec![("tenant_id".to_string(), "globex".to_string())];
        let err = run(&h, Some(route), Some(&token), &globex, T)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AssertionFailure);
    }
}
