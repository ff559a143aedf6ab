/*
 * Responsibility
 * - GET /api/v1/sessions/current (SESSION token 専用)
 */
use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::AuthCtxExtractor;
use crate::services::token::Assertions;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSession {
    pub context: String,
    pub assertions: Assertions,
}

pub async fn current_session(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<CurrentSession> {
    Json(CurrentSession {
        context: ctx.context,
        assertions: ctx.assertions,
    })
}
