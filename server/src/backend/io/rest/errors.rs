//! HTTP translation of domain errors.

use axum::http::{header::RETRY_AFTER, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use tracing::error;

use crate::backend::domain::models::PointsError;
use shared::ErrorResponse;

pub fn status_for(err: &PointsError) -> StatusCode {
    match err {
        PointsError::Authentication(_) => StatusCode::UNAUTHORIZED,
        PointsError::Authorization(_) => StatusCode::FORBIDDEN,
        PointsError::Validation(_) => StatusCode::BAD_REQUEST,
        PointsError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
        PointsError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        PointsError::NotFound(_) => StatusCode::NOT_FOUND,
        PointsError::VoucherUnavailable(_) | PointsError::Conflict(_) => StatusCode::CONFLICT,
        PointsError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PointsError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let message = match &self {
            PointsError::Internal(e) => {
                error!("Request failed: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                success: false,
                error: message,
            }),
        )
            .into_response();

        if let PointsError::RateLimited { retry_after } = &self {
            // Whole seconds, rounded up
            let seconds = (retry_after.as_millis() as u64).div_ceil(1000).max(1);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
