/*
 * Responsibility
 * - v1 の公開ポイント (routes() / policies() の re-export)
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{PREFIX, policies, routes};
