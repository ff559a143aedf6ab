/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - validator: RequestValidator (policy / cipher / key cache / assertion chain)
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::services::pipeline::RequestValidator;

#[derive(Clone, Debug)]
pub struct AppState {
    pub validator: Arc<RequestValidator>,
}

impl AppState {
    pub fn new(validator: Arc<RequestValidator>) -> Self {
        Self { validator }
    }
}
