/*
 * Responsibility
 * - GET /api/v1/tenants/{tenant_id}/profile
 * - tenant の一致チェックは assertion chain (ASSERTION_PATH_BINDINGS) 側で行う
 */
use axum::{Json, extract::Path};
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;
use crate::services::token::TokenType;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantProfile {
    pub tenant_id: String,
    pub requested_by: String,
    pub token_type: TokenType,
}

pub async fn tenant_profile(
    Path(tenant_id): Path<String>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Json<TenantProfile> {
    Json(TenantProfile {
        tenant_id,
        requested_by: ctx.context,
        token_type: ctx.token_type,
    })
}
