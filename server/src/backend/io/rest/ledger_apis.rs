//! # REST API for Balances, the Ledger, Tiers and Leaderboards

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use tracing::info;

use super::mappers::{TierMapper, TransactionMapper};
use crate::backend::domain::commands::ledger::TransactionListQuery;
use crate::backend::domain::models::PointsError;
use crate::backend::AppState;
use shared::{
    BalanceResponse, LedgerAuditResponse, LeaderboardResponse, TierListResponse,
    TransactionListResponse,
};

// Query parameters for transaction listing API
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub after: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
}

pub async fn get_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BalanceResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("GET /api/balance - uid: {}", identity.uid);

    let summary = state.balance_service.balance(&identity.uid).await?;
    Ok(Json(TransactionMapper::to_balance_response(summary)))
}

/// List the caller's ledger newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Json<TransactionListResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    let Query(query) = query.map_err(|e| PointsError::Validation(e.body_text()))?;
    info!("GET /api/transactions - uid: {}, query: {:?}", identity.uid, query);

    let result = state
        .balance_service
        .list_transactions(
            &identity.uid,
            TransactionListQuery {
                after: query.after,
                limit: query.limit,
            },
        )
        .await?;
    Ok(Json(TransactionMapper::to_list_response(result)))
}

pub async fn audit_ledger(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LedgerAuditResponse>, PointsError> {
    let identity = state.identify(&headers)?;
    info!("GET /api/ledger/audit - uid: {}", identity.uid);

    let audit = state.balance_service.audit(&identity.uid).await?;
    Ok(Json(TransactionMapper::to_audit_response(audit)))
}

pub async fn list_tiers(State(state): State<AppState>) -> Result<Json<TierListResponse>, PointsError> {
    info!("GET /api/tiers");
    let table = state.tier_service.table().await?;
    Ok(Json(TierMapper::to_list_response(table)))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>, PointsError> {
    let Query(query) = query.map_err(|e| PointsError::Validation(e.body_text()))?;
    info!("GET /api/leaderboard/{} - query: {:?}", game_id, query);

    let ranked = state.leaderboard_service.top(&game_id, query.limit).await?;
    Ok(Json(TierMapper::to_leaderboard_response(&game_id, ranked)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::{bearer, setup_test_state};
    use shared::AwardGameRequest;

    async fn award(state: &AppState, uid: &str, game_id: &str) {
        super::super::award_apis::award_game(
            State(state.clone()),
            bearer(state, uid),
            Ok(Json(AwardGameRequest {
                game_id: Some(game_id.to_string()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_balance_ledger_and_audit_agree() {
        let state = setup_test_state().await;
        award(&state, "alice", "catan").await;
        award(&state, "alice", "chess").await;

        let balance = get_balance(State(state.clone()), bearer(&state, "alice")).await.unwrap();
        assert!(balance.points > 0);
        assert_eq!(balance.current_tier.name, "Bronze");

        let page = list_transactions(
            State(state.clone()),
            bearer(&state, "alice"),
            Ok(Query(TransactionsQuery { after: None, limit: Some(1) })),
        )
        .await
        .unwrap();
        assert_eq!(page.transactions.len(), 1);
        assert!(page.pagination.has_more);

        let audit = audit_ledger(State(state.clone()), bearer(&state, "alice")).await.unwrap();
        assert!(audit.reconciled);
        assert_eq!(audit.ledger_points, balance.points);
        assert_eq!(audit.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_public_tier_and_leaderboard_reads() {
        let state = setup_test_state().await;
        award(&state, "alice", "catan").await;

        let tiers = list_tiers(State(state.clone())).await.unwrap();
        assert_eq!(tiers.tiers.first().map(|t| t.min_xp), Some(0));

        let board = get_leaderboard(
            State(state.clone()),
            Path("catan".to_string()),
            Ok(Query(LeaderboardQuery { limit: None })),
        )
        .await
        .unwrap();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].rank, 1);
        assert_eq!(board.entries[0].uid, "alice");
    }
}
