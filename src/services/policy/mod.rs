//! Route policy registration.
//!
//! Policies are declared once at startup in a table; the pipeline only sees
//! the `PolicyResolver` trait.

use std::collections::HashMap;

use axum::http::Method;

use crate::services::token::types::{AllowedTokenTypes, TokenType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePolicy {
    /// No token required.
    Exempt,
    /// A token of one of these types is required.
    Secured(AllowedTokenTypes),
}

impl RoutePolicy {
    pub fn secured(types: impl IntoIterator<Item = TokenType>) -> Self {
        Self::Secured(AllowedTokenTypes::new(types))
    }

    /// Secured with no acceptable type: every token is rejected.
    pub fn deny() -> Self {
        Self::Secured(AllowedTokenTypes::default())
    }
}

pub trait PolicyResolver: Send + Sync {
    /// `route` is the matched route template, not the concrete path.
    fn resolve(&self, method: &Method, route: &str) -> RoutePolicy;
}

/// Static route -> policy table.
///
/// Lookup order: exact route for the method, exact route for any method,
/// longest matching scope prefix, then the fallback for unregistered routes.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    routes: HashMap<(Option<Method>, String), RoutePolicy>,
    scopes: Vec<(String, RoutePolicy)>,
    unregistered: RoutePolicy,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::new(RoutePolicy::Exempt)
    }
}

impl PolicyTable {
    pub fn new(unregistered: RoutePolicy) -> Self {
        Self {
            routes: HashMap::new(),
            scopes: Vec::new(),
            unregistered,
        }
    }

    /// Registers an exact route. `None` applies to every method.
    pub fn route(
        mut self,
        method: Option<Method>,
        route: impl Into<String>,
        policy: RoutePolicy,
    ) -> Self {
        self.routes.insert((method, route.into()), policy);
        self
    }

    pub fn exempt(self, method: Method, route: impl Into<String>) -> Self {
        self.route(Some(method), route, RoutePolicy::Exempt)
    }

    pub fn secure(
        self,
        method: Method,
        route: impl Into<String>,
        types: impl IntoIterator<Item = TokenType>,
    ) -> Self {
        self.route(Some(method), route, RoutePolicy::secured(types))
    }

    /// Registers a policy for every route under `prefix` (segment aligned).
    pub fn scope(mut self, prefix: impl Into<String>, policy: RoutePolicy) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        self.scopes.push((prefix, policy));
        self
    }

    /// A route known under other methods never falls back to the unregistered
    /// default: secured under any method means deny, all-exempt stays exempt.
    fn registered_for_other_methods(&self, route: &str) -> Option<RoutePolicy> {
        let mut policies = self
            .routes
            .iter()
            .filter(|((_, r), _)| r == route)
            .map(|(_, policy)| policy)
            .peekable();
        policies.peek()?;
        if policies.any(|p| matches!(p, RoutePolicy::Secured(_))) {
            Some(RoutePolicy::deny())
        } else {
            Some(RoutePolicy::Exempt)
        }
    }

    fn scope_for(&self, route: &str) -> Option<&RoutePolicy> {
        self.scopes
            .iter()
            .filter(|(prefix, _)| {
                route == prefix
                    || prefix.is_empty()
                    || route
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, policy)| policy)
    }
}

impl PolicyResolver for PolicyTable {
    fn resolve(&self, method: &Method, route: &str) -> RoutePolicy {
        let lookup = |m: Option<Method>| self.routes.get(&(m, route.to_string()));

        let exact = lookup(Some(method.clone()))
            // axum serves HEAD from the GET handler
            .or_else(|| (*method == Method::HEAD).then(|| lookup(Some(Method::GET))).flatten())
            .or_else(|| lookup(None));
        if let Some(policy) = exact {
            return policy.clone();
        }

        if let Some(policy) = self.registered_for_other_methods(route) {
            return policy;
        }

        self.scope_for(route)
            .unwrap_or(&self.unregistered)
            .clone()
    }
}
