//! # REST API for Vouchers

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use tracing::info;

use super::mappers::SpendMapper;
use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::{ConsumeRedemptionResponse, RedeemVoucherResponse, VoucherListResponse};

pub async fn list_vouchers(State(state): State<AppState>) -> Result<Json<VoucherListResponse>, PointsError> {
    info!("GET /api/vouchers");
    let vouchers = state.voucher_service.list_catalog().await?;
    Ok(Json(SpendMapper::to_catalog_response(vouchers)))
}

/// Exchange points for a voucher code
pub async fn redeem_voucher(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(voucher_id): Path<String>,
) -> Result<Json<RedeemVoucherResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("POST /api/vouchers/{}/redeem - uid: {}", voucher_id, identity.uid);

    let result = state.voucher_service.redeem(&identity.uid, &voucher_id).await?;
    Ok(Json(SpendMapper::to_redeem_response(result)))
}

/// Mark one of the caller's codes as used
pub async fn consume_redemption(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Json<ConsumeRedemptionResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("POST /api/vouchers/redemptions/{}/consume - uid: {}", code, identity.uid);

    let redemption = state.voucher_service.consume(&identity.uid, &code).await?;
    Ok(Json(SpendMapper::to_consume_response(redemption)))
}
