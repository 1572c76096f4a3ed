use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::cache::CacheStats;
use crate::state::AppState;

/// GET /api/v1/cache/stats
pub async fn handle_cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.core.cache_stats())
}

/// POST /api/v1/cache/clear
pub async fn handle_cache_clear(State(state): State<AppState>) -> Json<Value> {
    state.core.clear_cache().await;
    Json(json!({ "status": "cleared" }))
}
