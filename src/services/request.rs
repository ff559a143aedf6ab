use axum::http::{HeaderMap, Method, Uri, header};

/// The parts of an inbound request the validation pipeline looks at.
///
/// Kept free of any router types so the pipeline can be driven from tests or
/// another HTTP stack.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    /// Matched route template, e.g. `/api/v1/tenants/{tenant_id}/profile`.
    /// `None` when the request matched no route.
    pub route: Option<&'a str>,
    pub path_params: &'a [(String, String)],
}

impl<'a> RequestView<'a> {
    /// Raw Authorization value; no scheme is stripped.
    pub fn authorization(&self) -> Option<&'a str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn path_param(&self, name: &str) -> Option<&'a str> {
        self.path_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
