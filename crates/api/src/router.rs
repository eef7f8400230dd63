//! Router assembly and middleware stack.

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

/// Build the application router.
pub fn build(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(AllowOrigin::list(
            state
                .config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        ));

    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/v1/generations", post(routes::generations::create_generation))
        .route("/api/v1/generations/{id}", get(routes::generations::get_generation))
        .route(
            "/api/v1/generations/{id}/ledger",
            get(routes::generations::get_generation_ledger),
        )
        .route("/api/v1/users/{id}/credits", get(routes::credits::get_credits))
        .route("/api/v1/hooks/render/{provider}", post(routes::hooks::render_callback))
        .layer(TraceLayer::new_for_http())
        .layer(timeout)
        .layer(cors)
        .with_state(state)
}
