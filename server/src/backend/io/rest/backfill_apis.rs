//! # REST API for Ledger Backfill

use axum::{extract::State, http::HeaderMap, response::Json};
use tracing::info;

use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::BackfillResponse;

/// Reconcile the caller's ledger with the records that imply it
pub async fn backfill_ledger(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BackfillResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("POST /api/backfill - uid: {}", identity.uid);

    let result = state.backfill_service.backfill_user(&identity.uid).await?;
    let message = if result.backfilled_count == 0 {
        "Ledger already up to date".to_string()
    } else {
        format!(
            "Backfilled {} transactions ({} estimated)",
            result.backfilled_count, result.estimated_count
        )
    };
    Ok(Json(BackfillResponse {
        success: true,
        backfilled_count: result.backfilled_count,
        message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::sources::Order;
    use crate::backend::storage::SourceRepository;
    use crate::backend::test_support::{bearer, setup_test_state};

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let state = setup_test_state().await;
        SourceRepository::new(state.db.clone())
            .store_order(&Order {
                id: "o1".to_string(),
                uid: "alice".to_string(),
                status: "completed".to_string(),
                total: 20.0,
                points_earned: Some(20),
                points_spent: None,
                created_at: None,
            })
            .await
            .unwrap();

        let first = backfill_ledger(State(state.clone()), bearer(&state, "alice")).await.unwrap();
        assert_eq!(first.backfilled_count, 1);

        let second = backfill_ledger(State(state.clone()), bearer(&state, "alice")).await.unwrap();
        assert_eq!(second.backfilled_count, 0);
        assert_eq!(second.message, "Ledger already up to date");
    }
}
