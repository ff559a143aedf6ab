/*
 * Responsibility
 * - Handler から見える「検証済みコンテキスト」の型
 * - middleware が token を検証して request extensions に格納し、handler はこの型だけを受け取る
 *
 * Notes
 * - 復号 / 署名検証 / assertion チェックは middleware/services 側の責務
 */

use serde::Serialize;

use crate::services::pipeline::VerifiedToken;
use crate::services::token::{Assertions, TokenType};

/// 検証済みのリクエストに付与されるコンテキスト
///
/// - `token_type` は復号した secret 内の型 (payload 平文の型は信用しない)
/// - `context` は署名鍵の持ち主
/// - `assertions` は caller が主張する業務属性 (tenant 等)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthCtx {
    pub token_type: TokenType,
    pub context: String,
    pub assertions: Assertions,
}

impl From<VerifiedToken> for AuthCtx {
    fn from(v: VerifiedToken) -> Self {
        Self {
            token_type: v.token_type,
            context: v.context,
            assertions: v.assertions,
        }
    }
}
