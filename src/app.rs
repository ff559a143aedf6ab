/*
 * Responsibility
 * - tracing / panic hook 初期化
 * - Config読み込み → 依存生成 (cipher, key cache, fetcher, policy table, assertion chain)
 * - Router 組み立て + Middleware の適用 (token gate / http layers)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use axum::{Router, http::Method, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, v1::handlers::health::health};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::{
    assertion::{AssertionChain, BindingParseError, HeaderBinding, PathParamBinding},
    keys::{HttpKeyFetcher, PublicKeyCache, SignatureVerifier},
    pipeline::RequestValidator,
    policy::PolicyTable,
    token::{ChaChaCipher, PayloadDecryptor},
};
use crate::state::AppState;

pub const HEALTH_ROUTE: &str = "/health";

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,token_guard=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: crash immediately so it gets noticed
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting token gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(AppError::startup)?;
    axum::serve(listener, app)
        .await
        .map_err(AppError::startup)?;

    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState, AppError> {
    let cipher = ChaChaCipher::from_key_material(&config.token_cipher_key)
        .map_err(AppError::startup)?;

    let fetcher = HttpKeyFetcher::new(
        config.key_service_base_url.clone(),
        config.key_fetch_timeout,
    )
    .map_err(AppError::startup)?;

    let verifier = SignatureVerifier::new(
        Arc::new(PublicKeyCache::new()),
        Arc::new(fetcher),
        config.key_fetch_timeout,
    );

    let policies = api::v1::policies(
        PolicyTable::new(config.unregistered_routes.policy()).exempt(Method::GET, HEALTH_ROUTE),
    );

    let assertions = assertion_chain(config).map_err(AppError::startup)?;
    tracing::info!(
        unregistered_routes = ?config.unregistered_routes,
        assertion_checks = ?assertions,
        key_service = ?config.key_service_base_url.as_ref().map(|u| u.as_str()),
        "token validation configured"
    );

    let validator = RequestValidator::new(
        PayloadDecryptor::new(Arc::new(cipher)),
        verifier,
        Arc::new(policies),
        assertions,
    );

    Ok(AppState::new(Arc::new(validator)))
}

fn assertion_chain(config: &Config) -> Result<AssertionChain, BindingParseError> {
    let mut chain = AssertionChain::new();
    for (assertion, param) in &config.assertion_path_bindings {
        chain.push(PathParamBinding::new(assertion, param));
    }
    for (assertion, header) in &config.assertion_header_bindings {
        chain.push(HeaderBinding::new(assertion, header)?);
    }
    Ok(chain)
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route(HEALTH_ROUTE, get(health))
        .nest(api::v1::PREFIX, api::v1::routes());

    // gate every matched route; unmatched requests fall through to the 404 fallback
    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);

    middleware::http::apply(router)
}
