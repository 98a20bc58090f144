//! Balance lookups, ledger listing and the ledger-versus-balance audit.

use tracing::{info, warn};

use crate::backend::domain::commands::ledger::{
    BalanceSummary, LedgerAudit, PaginationInfo, TransactionListQuery, TransactionListResult,
};
use crate::backend::domain::models::balance::AccountBalance;
use crate::backend::domain::models::PointsResult;
use crate::backend::domain::tier_service::TierService;
use crate::backend::storage::{BalanceRepository, TransactionRepository};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct BalanceService {
    balance_repository: BalanceRepository,
    transaction_repository: TransactionRepository,
    tier_service: TierService,
}

impl BalanceService {
    pub fn new(
        balance_repository: BalanceRepository,
        transaction_repository: TransactionRepository,
        tier_service: TierService,
    ) -> Self {
        Self {
            balance_repository,
            transaction_repository,
            tier_service,
        }
    }

    /// Balance with tier progress. Users without activity get an empty balance.
    pub async fn balance(&self, uid: &str) -> PointsResult<BalanceSummary> {
        let balance = self
            .balance_repository
            .get_balance(uid)
            .await?
            .unwrap_or_else(|| AccountBalance::empty(uid, ""));
        let tiers = self.tier_service.table().await?;

        Ok(BalanceSummary {
            current_tier: tiers.resolve(balance.xp),
            next_tier: tiers.next_tier(balance.xp),
            balance,
        })
    }

    /// Newest first, paginated by the id of the last entry of the previous page
    pub async fn list_transactions(&self, uid: &str, query: TransactionListQuery) -> PointsResult<TransactionListResult> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let query_limit = limit + 1;

        let mut transactions = self
            .transaction_repository
            .list_transactions(uid, query_limit, query.after.as_deref())
            .await?;

        let has_more = transactions.len() > limit as usize;
        if has_more {
            transactions.truncate(limit as usize);
        }

        let next_cursor = if has_more {
            transactions.last().map(|t| t.id.clone())
        } else {
            None
        };

        Ok(TransactionListResult {
            transactions,
            pagination: PaginationInfo {
                has_more,
                next_cursor,
            },
        })
    }

    /// Compare the sum of the ledger with the stored balance
    pub async fn audit(&self, uid: &str) -> PointsResult<LedgerAudit> {
        info!("Auditing ledger for {}", uid);
        let transactions = self.transaction_repository.get_all_transactions(uid).await?;
        let balance_points = self
            .balance_repository
            .get_balance(uid)
            .await?
            .map_or(0, |b| b.points);

        let audit = LedgerAudit {
            uid: uid.to_string(),
            balance_points,
            ledger_points: transactions.iter().map(|t| t.signed_amount()).sum(),
            transaction_count: transactions.len(),
            backfilled_count: transactions.iter().filter(|t| t.metadata.backfilled).count(),
        };

        if audit.is_reconciled() {
            info!("Ledger for {} matches balance ({} points)", uid, balance_points);
        } else {
            warn!(
                "Ledger drift for {}: balance {} vs ledger {} ({} backfilled entries)",
                uid, audit.balance_points, audit.ledger_points, audit.backfilled_count
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::tier::TierTable;
    use crate::backend::domain::models::transaction::{
        Transaction, TransactionMetadata, TransactionSource, TransactionType,
    };
    use crate::backend::storage::{DbConnection, LedgerSession, TierRepository};

    async fn create_test_service() -> (BalanceService, DbConnection) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let tier_service = TierService::new(TierRepository::new(db.clone()));
        tier_service.seed(&TierTable::default_tiers()).await.unwrap();
        let service = BalanceService::new(
            BalanceRepository::new(db.clone()),
            TransactionRepository::new(db.clone()),
            tier_service,
        );
        (service, db)
    }

    async fn record(db: &DbConnection, uid: &str, kind: TransactionType, amount: i64, move_balance: bool) {
        let mut session = LedgerSession::begin(db).await.unwrap();
        session.ensure_balance(uid, "t").await.unwrap();
        if move_balance {
            match kind {
                TransactionType::Earn => session.credit(uid, amount, amount, 0, "t").await.unwrap(),
                TransactionType::Spend => assert!(session.try_debit(uid, amount, "t").await.unwrap()),
            }
        }
        let source = match kind {
            TransactionType::Earn => TransactionSource::GameAward,
            TransactionType::Spend => TransactionSource::RewardRedemption,
        };
        let transaction = Transaction::new(uid, kind, amount, source, "test", TransactionMetadata::default(), "t");
        session.append_transaction(&transaction).await.unwrap();
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_balance_with_tier_progress() {
        let (service, db) = create_test_service().await;
        record(&db, "alice", TransactionType::Earn, 600, true).await;

        let summary = service.balance("alice").await.unwrap();
        assert_eq!(summary.balance.points, 600);
        assert_eq!(summary.current_tier.name, "Silver");
        assert_eq!(summary.next_tier.as_ref().map(|t| t.name.as_str()), Some("Gold"));
        assert_eq!(summary.xp_to_next_tier(), Some(1400));

        let newcomer = service.balance("bob").await.unwrap();
        assert_eq!(newcomer.balance.points, 0);
        assert_eq!(newcomer.current_tier.name, "Bronze");
    }

    #[tokio::test]
    async fn test_list_transactions_pagination() {
        let (service, db) = create_test_service().await;
        for amount in 1..=5 {
            record(&db, "alice", TransactionType::Earn, amount, true).await;
        }

        let page = service
            .list_transactions("alice", TransactionListQuery { after: None, limit: Some(3) })
            .await
            .unwrap();
        assert_eq!(page.transactions.len(), 3);
        assert!(page.pagination.has_more);
        assert_eq!(page.transactions[0].amount, 5);

        let rest = service
            .list_transactions(
                "alice",
                TransactionListQuery {
                    after: page.pagination.next_cursor.clone(),
                    limit: Some(3),
                },
            )
            .await
            .unwrap();
        assert_eq!(rest.transactions.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![2, 1]);
        assert!(!rest.pagination.has_more);
        assert!(rest.pagination.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_audit_reports_drift() {
        let (service, db) = create_test_service().await;
        record(&db, "alice", TransactionType::Earn, 100, true).await;
        record(&db, "alice", TransactionType::Spend, 30, true).await;

        let audit = service.audit("alice").await.unwrap();
        assert_eq!(audit.ledger_points, 70);
        assert!(audit.is_reconciled());

        // Ledger entry without a matching balance change
        record(&db, "alice", TransactionType::Earn, 5, false).await;
        let audit = service.audit("alice").await.unwrap();
        assert_eq!(audit.drift(), -5);
        assert!(!audit.is_reconciled());
        assert_eq!(audit.transaction_count, 3);
    }
}
