/*
 * Responsibility
 * - middleware の公開インターフェース
 * - http: request-id / trace / body limit / timeout / response headers
 * - auth: token gate (RequestValidator → AuthCtx)
 */
pub mod auth;
pub mod http;
