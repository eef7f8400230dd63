//! Shared application state for HTTP handlers.

use sqlx::PgPool;

use crate::config::ServerConfig;

/// Cloned into every handler by axum.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ServerConfig,
}
