use axum::{extract::State, Json};

use crate::resilience::BreakerStats;
use crate::state::AppState;

/// GET /api/v1/circuit-breakers
/// One entry per provider that has been called at least once, sorted by name.
pub async fn handle_circuit_breakers(State(state): State<AppState>) -> Json<Vec<BreakerStats>> {
    Json(state.core.breaker_stats())
}
