use axum::http::HeaderName;
use serde_json::Value;
use thiserror::Error;

use super::AssertionCheck;
use crate::services::request::RequestView;
use crate::services::token::types::{AllowedTokenTypes, Assertions, TokenType};

/// Assertion `assertion` must equal path parameter `param` on routes that have it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParamBinding {
    pub assertion: String,
    pub param: String,
    label: String,
}

impl PathParamBinding {
    pub fn new(assertion: impl Into<String>, param: impl Into<String>) -> Self {
        let assertion = assertion.into();
        let param = param.into();
        let label = format!("path:{assertion}={param}");
        Self {
            assertion,
            param,
            label,
        }
    }
}

impl AssertionCheck for PathParamBinding {
    fn check(
        &self,
        _allowed: &AllowedTokenTypes,
        _actual: TokenType,
        assertions: &Assertions,
        request: &RequestView<'_>,
    ) -> bool {
        match request.path_param(&self.param) {
            Some(expected) => assertion_equals(assertions.get(&self.assertion), expected),
            None => true,
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Assertion `assertion` must equal header `header` whenever the request carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBinding {
    pub assertion: String,
    pub header: HeaderName,
    label: String,
}

impl HeaderBinding {
    /// Fails when `header` is not a valid header name.
    pub fn new(
        assertion: impl Into<String>,
        header: impl AsRef<str>,
    ) -> Result<Self, BindingParseError> {
        let assertion = assertion.into();
        let raw = header.as_ref();
        let header = HeaderName::from_bytes(raw.as_bytes())
            .map_err(|_| BindingParseError(format!("{assertion}={raw}")))?;
        let label = format!("header:{assertion}={header}");
        Ok(Self {
            assertion,
            header,
            label,
        })
    }
}

impl AssertionCheck for HeaderBinding {
    fn check(
        &self,
        _allowed: &AllowedTokenTypes,
        _actual: TokenType,
        assertions: &Assertions,
        request: &RequestView<'_>,
    ) -> bool {
        let Some(value) = request.headers.get(&self.header) else {
            return true;
        };
        // present but not visible ascii never matches
        match value.to_str() {
            Ok(expected) => assertion_equals(assertions.get(&self.assertion), expected),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}

fn assertion_equals(value: Option<&Value>, expected: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        _ => false,
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid binding {0:?}: expected assertion=target")]
pub struct BindingParseError(pub String);

/// Parses `a=b,c=d` into pairs. Blank input yields no pairs.
pub fn parse_bindings(raw: &str) -> Result<Vec<(String, String)>, BindingParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((a, t)) if !a.trim().is_empty() && !t.trim().is_empty() => {
                Ok((a.trim().to_string(), t.trim().to_string()))
            }
            _ => Err(BindingParseError(entry.to_string())),
        })
        .collect()
}
