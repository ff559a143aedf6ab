/*
 * Responsibility
 * - GET /api/v1/whoami
 * - 検証済み token の type / context / assertions をそのまま返す
 */
use axum::Json;

use crate::api::v1::extractors::{AuthCtx, AuthCtxExtractor};

pub async fn whoami(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<AuthCtx> {
    Json(ctx)
}
