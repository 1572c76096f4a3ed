use axum::{extract::State, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::matching::CompatibilityReport;
use crate::models::{ParsedCv, ParsedJd};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CompatibilityRequest {
    pub parsed_cv: ParsedCv,
    pub parsed_jd: ParsedJd,
}

/// POST /api/v1/compatibility
pub async fn handle_compatibility(
    State(state): State<AppState>,
    Json(req): Json<CompatibilityRequest>,
) -> Result<Json<CompatibilityReport>, AppError> {
    req.parsed_cv.validate()?;
    req.parsed_jd.validate()?;

    let report = state
        .core
        .compute_compatibility(&req.parsed_cv, &req.parsed_jd)
        .await;
    Ok(Json(report))
}
