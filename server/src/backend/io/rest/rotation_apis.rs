//! # REST API for the Daily Rotation

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
};
use tracing::info;

use super::auth::require_admin;
use super::mappers::RotationMapper;
use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::{ReplaceRotationPolicyRequest, RotationPolicyResponse};

/// Today's policy; generates today's rotation on first use
pub async fn get_rotation(State(state): State<AppState>) -> Result<Json<RotationPolicyResponse>, PointsError> {
    info!("GET /api/rotation");
    let snapshot = state.rotation_service.current_policy().await?;
    Ok(Json(RotationMapper::to_response(snapshot)))
}

/// Replace the policy and regenerate today's rotation
pub async fn replace_rotation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ReplaceRotationPolicyRequest>, JsonRejection>,
) -> Result<Json<RotationPolicyResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    require_admin(&identity)?;
    let Json(request) = body.map_err(|e| PointsError::Validation(e.body_text()))?;
    info!("POST /api/rotation - uid: {}, request: {:?}", identity.uid, request);

    let snapshot = state
        .rotation_service
        .replace_policy(RotationMapper::to_command(request))
        .await?;
    Ok(Json(RotationMapper::to_response(snapshot)))
}

/// Re-roll today's rotation with the current pool
pub async fn reroll_rotation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RotationPolicyResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    require_admin(&identity)?;
    info!("PUT /api/rotation - uid: {}", identity.uid);

    let snapshot = state.rotation_service.reroll_today().await?;
    Ok(Json(RotationMapper::to_response(snapshot)))
}
