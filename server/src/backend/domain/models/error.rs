//! Error taxonomy shared by every domain service.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Too many requests, retry after {} seconds", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Voucher unavailable: {0}")]
    VoucherUnavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for PointsError {
    fn from(err: sqlx::Error) -> Self {
        PointsError::Internal(err.into())
    }
}

pub type PointsResult<T> = std::result::Result<T, PointsError>;
