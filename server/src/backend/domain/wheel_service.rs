//! Prize wheel: one free spin per canonical day, paid spins after that.
//! Prizes are drawn here, never by the client.

use tracing::{info, warn};

use crate::backend::domain::calendar::CalendarService;
use crate::backend::domain::commands::spend::{SpinResult, WheelStatus};
use crate::backend::domain::models::transaction::{
    Transaction, TransactionMetadata, TransactionSource, TransactionType,
};
use crate::backend::domain::models::wheel::{PrizeKind, PrizeTable, WheelPrize, WheelSpin};
use crate::backend::domain::models::{PointsError, PointsResult};
use crate::backend::storage::{BalanceRepository, DbConnection, LedgerSession};

#[derive(Clone)]
pub struct WheelService {
    db: DbConnection,
    balance_repository: BalanceRepository,
    calendar: CalendarService,
    prizes: PrizeTable,
    spin_cost: i64,
}

impl WheelService {
    pub fn new(
        db: DbConnection,
        balance_repository: BalanceRepository,
        calendar: CalendarService,
        prizes: PrizeTable,
        spin_cost: i64,
    ) -> Self {
        Self {
            db,
            balance_repository,
            calendar,
            prizes,
            spin_cost,
        }
    }

    pub async fn status(&self, uid: &str) -> PointsResult<WheelStatus> {
        let today = self.calendar.today_string();
        let balance = self.balance_repository.get_balance(uid).await?;
        let free_spin_available = balance
            .as_ref()
            .map_or(true, |b| b.last_spin_date.as_deref() != Some(today.as_str()));

        Ok(WheelStatus {
            free_spin_available,
            spin_cost: self.spin_cost,
            balance: balance.map_or(0, |b| b.points),
            prizes: self.prizes.prizes().to_vec(),
        })
    }

    pub async fn spin(&self, uid: &str) -> PointsResult<SpinResult> {
        let prize = {
            let mut rng = rand::thread_rng();
            self.prizes.draw(&mut rng).clone()
        };
        self.spin_for_prize(uid, prize).await
    }

    async fn spin_for_prize(&self, uid: &str, prize: WheelPrize) -> PointsResult<SpinResult> {
        let today = self.calendar.today_string();
        let now = self.calendar.now_rfc3339();
        let spin_id = WheelSpin::generate_id();

        let mut session = LedgerSession::begin(&self.db).await?;
        session.ensure_balance(uid, &now).await?;

        let was_free = session.claim_free_spin(uid, &today, &now).await?;
        let mut points_charged = 0;
        if !was_free && self.spin_cost > 0 {
            if !session.try_debit(uid, self.spin_cost, &now).await? {
                let available = session.balance(uid).await?.map(|b| b.points).unwrap_or(0);
                warn!("Paid spin refused for {}: needs {}, has {}", uid, self.spin_cost, available);
                return Err(PointsError::InsufficientBalance {
                    required: self.spin_cost,
                    available,
                });
            }
            points_charged = self.spin_cost;

            let charge = Transaction::new(
                uid,
                TransactionType::Spend,
                self.spin_cost,
                TransactionSource::WheelSpin,
                "Wheel spin",
                TransactionMetadata {
                    spin_id: Some(spin_id.clone()),
                    ..Default::default()
                },
                now.clone(),
            );
            session.append_transaction(&charge).await?;
        }

        let points_won = if prize.kind == PrizeKind::Points { prize.value } else { 0 };
        if points_won > 0 {
            session.credit(uid, points_won, 0, 0, &now).await?;
            let winnings = Transaction::new(
                uid,
                TransactionType::Earn,
                points_won,
                TransactionSource::WheelPrize,
                format!("Wheel prize: {}", prize.label),
                TransactionMetadata {
                    spin_id: Some(spin_id.clone()),
                    prize_id: Some(prize.id.clone()),
                    ..Default::default()
                },
                now.clone(),
            );
            session.append_transaction(&winnings).await?;
        }

        let spin = WheelSpin {
            id: spin_id,
            uid: uid.to_string(),
            prize_id: prize.id.clone(),
            prize_kind: prize.kind,
            prize_value: prize.value,
            was_free,
            points_charged,
            spun_at: now,
        };
        session.insert_spin(&spin).await?;
        let new_balance = session.balance(uid).await?.map(|b| b.points).unwrap_or(0);
        session.commit().await?;

        info!(
            "{} spun the wheel ({}): won {} ({})",
            uid,
            if was_free { "free" } else { "paid" },
            prize.id,
            prize.kind.as_str()
        );
        Ok(SpinResult {
            spin,
            prize,
            points_won,
            new_balance,
        })
    }
}
