//! Token gate: RequestValidator → AuthCtx を extensions に入れる
//!
//! - matched route / path params / headers を RequestView にまとめて validator に渡す
//! - 失敗時は原因をログに残し、client には一律 403 を返す
//! - 成功時は AuthCtx を extensions に格納 (handler は AuthCtxExtractor で受け取る)

use std::time::Instant;

use axum::{
    Router,
    body::Body,
    extract::{MatchedPath, RawPathParams, State, rejection::RawPathParamsRejection},
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::pipeline::Outcome;
use crate::services::request::RequestView;
use crate::state::AppState;

/// Applies the gate to every route registered so far.
///
/// `route_layer` keeps unmatched requests (404) out of the gate.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let started = Instant::now();

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_owned());
    let path_params: Vec<(String, String)> = params
        .map(|p| {
            p.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        })
        .unwrap_or_default();

    let view = RequestView {
        method: req.method(),
        uri: req.uri(),
        headers: req.headers(),
        route: route.as_deref(),
        path_params: &path_params,
    };
    let result = state.validator.validate(&view).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

    match result {
        Ok(Outcome::Exempt) => {}
        Ok(Outcome::Authorized(verified)) => {
            tracing::info!(
                route = route.as_deref(),
                token_type = %verified.token_type,
                context = %verified.context,
                elapsed_ms,
                "request authorized"
            );
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(AuthCtx::from(verified));
        }
        Err(err) => {
            tracing::warn!(
                route = route.as_deref(),
                kind = %err.kind(),
                error = %err,
                elapsed_ms,
                "request rejected"
            );
            return Err(err.into());
        }
    }

    Ok(next.run(req).await)
}
