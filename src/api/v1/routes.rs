/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - 各 route が受け付ける token type もここで宣言する (route と policy を同じ場所に置く)
 */
use axum::{Router, http::Method, routing::get};

use crate::services::policy::PolicyTable;
use crate::services::token::TokenType;
use crate::state::AppState;

use crate::api::v1::handlers::{
    sessions::current_session, tenants::tenant_profile, whoami::whoami,
};

pub const PREFIX: &str = "/api/v1";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/whoami", get(whoami))
        .route("/sessions/current", get(current_session))
        .route("/tenants/{tenant_id}/profile", get(tenant_profile))
}

/// Policies are keyed by the full matched route (prefix included).
pub fn policies(table: PolicyTable) -> PolicyTable {
    table
        .secure(
            Method::GET,
            format!("{PREFIX}/whoami"),
            [TokenType::Client, TokenType::Session, TokenType::Server],
        )
        .secure(
            Method::GET,
            format!("{PREFIX}/sessions/current"),
            [TokenType::Session],
        )
        .secure(
            Method::GET,
            format!("{PREFIX}/tenants/{{tenant_id}}/profile"),
            [TokenType::Session, TokenType::Server],
        )
}
