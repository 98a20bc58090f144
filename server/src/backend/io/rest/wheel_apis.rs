//! # REST API for the Prize Wheel

use axum::{extract::State, http::HeaderMap, response::Json};
use tracing::info;

use super::mappers::SpendMapper;
use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::{WheelSpinResponse, WheelStatusResponse};

pub async fn get_wheel(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WheelStatusResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("GET /api/wheel - uid: {}", identity.uid);

    let status = state.wheel_service.status(&identity.uid).await?;
    Ok(Json(SpendMapper::to_status_response(status)))
}

/// Spin once. The prize is drawn server-side.
pub async fn spin_wheel(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<WheelSpinResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("POST /api/wheel/spin - uid: {}", identity.uid);

    let result = state.wheel_service.spin(&identity.uid).await?;
    Ok(Json(SpendMapper::to_spin_response(result)))
}
