pub mod breakers;
pub mod cache;
pub mod compatibility;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/compatibility",
            post(compatibility::handle_compatibility),
        )
        .route("/api/v1/cache/stats", get(cache::handle_cache_stats))
        .route("/api/v1/cache/clear", post(cache::handle_cache_clear))
        .route(
            "/api/v1/circuit-breakers",
            get(breakers::handle_circuit_breakers),
        )
        .with_state(state)
}
