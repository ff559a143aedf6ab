//! Business-level checks over the decrypted assertions.
//!
//! Deployments register checks at startup; the chain passes only when every
//! check passes. An empty chain passes.

mod bindings;

use std::sync::Arc;

use tracing::debug;

use crate::services::request::RequestView;
use crate::services::token::types::{AllowedTokenTypes, Assertions, TokenType};

pub use bindings::{BindingParseError, HeaderBinding, PathParamBinding, parse_bindings};

pub trait AssertionCheck: Send + Sync {
    fn check(
        &self,
        allowed: &AllowedTokenTypes,
        actual: TokenType,
        assertions: &Assertions,
        request: &RequestView<'_>,
    ) -> bool;

    /// Label used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> AssertionCheck for F
where
    F: Fn(&AllowedTokenTypes, TokenType, &Assertions, &RequestView<'_>) -> bool + Send + Sync,
{
    fn check(
        &self,
        allowed: &AllowedTokenTypes,
        actual: TokenType,
        assertions: &Assertions,
        request: &RequestView<'_>,
    ) -> bool {
        self(allowed, actual, assertions, request)
    }
}

#[derive(Clone, Default)]
pub struct AssertionChain {
    checks: Vec<Arc<dyn AssertionCheck>>,
}

impl std::fmt::Debug for AssertionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.checks.iter().map(|c| c.name()))
            .finish()
    }
}

impl AssertionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, check: impl AssertionCheck + 'static) -> Self {
        self.push(check);
        self
    }

    pub fn push(&mut self, check: impl AssertionCheck + 'static) {
        self.checks.push(Arc::new(check));
    }

    /// Every check runs, so each failing one is logged.
    pub fn validate(
        &self,
        allowed: &AllowedTokenTypes,
        actual: TokenType,
        assertions: &Assertions,
        request: &RequestView<'_>,
    ) -> bool {
        self.checks.iter().fold(true, |passed, check| {
            let ok = check.check(allowed, actual, assertions, request);
            if !ok {
                debug!(check = check.name(), "assertion check failed");
            }
            passed & ok
        })
    }
}
