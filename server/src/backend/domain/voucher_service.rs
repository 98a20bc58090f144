use tracing::{info, warn};

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::commands::spend::RedeemVoucherResult;
use crate::backend::domain::models::transaction::{
    Transaction, TransactionMetadata, TransactionSource, TransactionType,
};
use crate::backend::domain::models::voucher::{Voucher, VoucherRedemption};
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::storage::{DbConnection, LedgerSession, VoucherRepository};

/// Voucher catalog, redemption (points for a code) and code consumption
#[derive(Clone)]
pub struct VoucherService {
    db: DbConnection,
    voucher_repository: VoucherRepository,
    calendar: CalendarService,
}

impl VoucherService {
    pub fn new(db: DbConnection, voucher_repository: VoucherRepository, calendar: CalendarService) -> Self {
        Self {
            db,
            voucher_repository,
            calendar,
        }
    }

    /// Upsert the configured catalog
    pub async fn sync_catalog(&self, vouchers: &[Voucher]) -> PointsResult<()> {
        for voucher in vouchers {
            voucher.validate()?;
            self.voucher_repository.upsert_voucher(voucher).await?;
        }
        info!("Voucher catalog synced ({} entries)", vouchers.len());
        Ok(())
    }

    pub async fn list_catalog(&self) -> PointsResult<Vec<Voucher>> {
        Ok(self.voucher_repository.list_active_vouchers().await?)
    }

    /// Exchange points for a single-use code
    pub async fn redeem(&self, uid: &str, voucher_id: &str) -> PointsResult<RedeemVoucherResult> {
        let voucher = self
            .voucher_repository
            .get_voucher(voucher_id)
            .await?
            .ok_or_else(|| PointsError::NotFound(format!("Voucher {} does not exist", voucher_id)))?;
        if !voucher.active {
            return Err(PointsError::VoucherUnavailable(format!(
                "Voucher {} is no longer offered",
                voucher_id
            )));
        }

        let now = self.calendar.now_rfc3339();
        let expires_at = self.calendar.days_from_now_rfc3339(voucher.validity_days);

        let mut session = LedgerSession::begin(&self.db).await?;
        session.ensure_balance(uid, &now).await?;

        if let Some(limit) = voucher.per_user_limit {
            let used = session.count_redemptions(uid, &voucher.id).await?;
            if used >= limit as i64 {
                return Err(PointsError::VoucherUnavailable(format!(
                    "Voucher {} can be redeemed at most {} time(s)",
                    voucher.id, limit
                )));
            }
        }

        if !session.try_debit(uid, voucher.points_cost, &now).await? {
            let available = session.balance(uid).await?.map(|b| b.points).unwrap_or(0);
            warn!(
                "Voucher {} refused for {}: needs {}, has {}",
                voucher.id, uid, voucher.points_cost, available
            );
            return Err(PointsError::InsufficientBalance {
                required: voucher.points_cost,
                available,
            });
        }

        let redemption = VoucherRedemption {
            id: VoucherRedemption::generate_id(),
            code: VoucherRedemption::generate_code(),
            uid: uid.to_string(),
            voucher_id: voucher.id.clone(),
            points_spent: voucher.points_cost,
            issued_at: now.clone(),
            expires_at,
            used_at: None,
        };
        session.insert_redemption(&redemption).await?;

        let metadata = TransactionMetadata {
            voucher_id: Some(voucher.id.clone()),
            redemption_id: Some(redemption.id.clone()),
            ..Default::default()
        };
        let transaction = Transaction::new(
            uid,
            TransactionType::Spend,
            voucher.points_cost,
            TransactionSource::RewardRedemption,
            format!("Redeemed voucher: {}", voucher.name),
            metadata,
            now,
        );
        session.append_transaction(&transaction).await?;

        let new_balance = session.balance(uid).await?.map(|b| b.points).unwrap_or(0);
        session.commit().await?;

        info!(
            "{} redeemed voucher {} for {} points (code {})",
            uid, voucher.id, voucher.points_cost, redemption.code
        );
        Ok(RedeemVoucherResult {
            redemption,
            new_balance,
        })
    }

    /// Mark a code as used. Only its owner can consume it, once, before it expires.
    pub async fn consume(&self, uid: &str, code: &str) -> PointsResult<VoucherRedemption> {
        let mut redemption = self
            .voucher_repository
            .get_redemption_by_code(code)
            .await?
            .filter(|r| r.uid == uid)
            .ok_or_else(|| PointsError::NotFound(format!("Redemption code {} not found", code)))?;

        if redemption.used_at.is_some() {
            return Err(PointsError::Conflict(format!("Code {} was already used", code)));
        }
        if self.calendar.is_past(&redemption.expires_at) {
            return Err(PointsError::VoucherUnavailable(format!("Code {} has expired", code)));
        }

        let used_at = self.calendar.now_rfc3339();
        if !self
            .voucher_repository
            .mark_redemption_used(code, uid, &used_at)
            .await?
        {
            return Err(PointsError::Conflict(format!("Code {} was already used", code)));
        }

        info!("{} consumed code {}", uid, code);
        redemption.used_at = Some(used_at);
        Ok(redemption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::voucher::DiscountType;
    use crate::backend::storage::{BalanceRepository, TransactionRepository};
    use chrono::{TimeZone, Utc};

    fn voucher(id: &str, cost: i64, limit: Option<u32>) -> Voucher {
        Voucher {
            id: id.to_string(),
            name: format!("Voucher {}", id),
            points_cost: cost,
            discount_type: DiscountType::FixedAmount,
            discount_value: 5.0,
            validity_days: 7,
            active: true,
            per_user_limit: limit,
            min_order_value: None,
        }
    }

    async fn setup_test(points: i64) -> (VoucherService, DbConnection, CalendarService) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let calendar = CalendarService::utc();
        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let service = VoucherService::new(db.clone(), VoucherRepository::new(db.clone()), calendar.clone());
        service
            .sync_catalog(&[voucher("five-off", 100, None), voucher("once", 10, Some(1))])
            .await
            .unwrap();

        let mut session = LedgerSession::begin(&db).await.unwrap();
        session.ensure_balance("alice", "t").await.unwrap();
        session.credit("alice", points, 0, 0, "t").await.unwrap();
        session.commit().await.unwrap();
        (service, db, calendar)
    }

    #[tokio::test]
    async fn test_redeem_debits_and_issues_code() {
        let (service, db, _) = setup_test(150).await;
        let result = service.redeem("alice", "five-off").await.unwrap();

        assert_eq!(result.new_balance, 50);
        assert!(result.redemption.code.starts_with("JP-"));
        assert!(result.redemption.expires_at.starts_with("2025-06-08"));

        let ledger = TransactionRepository::new(db).get_all_transactions("alice").await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].transaction_type, TransactionType::Spend);
        assert_eq!(ledger[0].source, TransactionSource::RewardRedemption);
        assert_eq!(ledger[0].metadata.redemption_id, Some(result.redemption.id));
    }

    #[tokio::test]
    async fn test_insufficient_balance_changes_nothing() {
        let (service, db, _) = setup_test(99).await;
        let err = service.redeem("alice", "five-off").await.unwrap_err();
        assert!(matches!(
            err,
            PointsError::InsufficientBalance { required: 100, available: 99 }
        ));

        let balance = BalanceRepository::new(db.clone()).get_balance("alice").await.unwrap().unwrap();
        assert_eq!(balance.points, 99);
        assert!(TransactionRepository::new(db.clone()).get_all_transactions("alice").await.unwrap().is_empty());
        assert!(VoucherRepository::new(db).list_redemptions("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_inactive_and_limited_vouchers() {
        let (service, _, _) = setup_test(500).await;
        assert!(matches!(
            service.redeem("alice", "nope").await.unwrap_err(),
            PointsError::NotFound(_)
        ));

        service.sync_catalog(&[Voucher { active: false, ..voucher("gone", 10, None) }]).await.unwrap();
        assert!(matches!(
            service.redeem("alice", "gone").await.unwrap_err(),
            PointsError::VoucherUnavailable(_)
        ));
        assert_eq!(service.list_catalog().await.unwrap().len(), 2);

        service.redeem("alice", "once").await.unwrap();
        assert!(matches!(
            service.redeem("alice", "once").await.unwrap_err(),
            PointsError::VoucherUnavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_consume_once_by_owner_before_expiry() {
        let (service, _, calendar) = setup_test(500).await;
        let first = service.redeem("alice", "five-off").await.unwrap().redemption;
        let second = service.redeem("alice", "five-off").await.unwrap().redemption;

        assert!(matches!(
            service.consume("mallory", &first.code).await.unwrap_err(),
            PointsError::NotFound(_)
        ));
        let used = service.consume("alice", &first.code).await.unwrap();
        assert!(used.used_at.is_some());
        assert!(matches!(
            service.consume("alice", &first.code).await.unwrap_err(),
            PointsError::Conflict(_)
        ));

        calendar.freeze_at(Utc.with_ymd_and_hms(2025, 6, 9, 0, 0, 0).unwrap());
        assert!(matches!(
            service.consume("alice", &second.code).await.unwrap_err(),
            PointsError::VoucherUnavailable(_)
        ));
    }
}
