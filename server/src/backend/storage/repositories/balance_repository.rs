use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::backend::domain::models::balance::AccountBalance;
use crate::backend::storage::connection::DbConnection;

/// Read access to balances. Every mutation goes through `LedgerSession`.
#[derive(Clone)]
pub struct BalanceRepository {
    db: DbConnection,
}

impl BalanceRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn get_balance(&self, uid: &str) -> Result<Option<AccountBalance>> {
        let row = sqlx::query(
            r#"
            SELECT uid, points, xp, game_xp, last_spin_date, updated_at
            FROM balances
            WHERE uid = ?
            "#,
        )
        .bind(uid)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(map_balance_row))
    }

    /// Every user that holds a balance row
    pub async fn list_uids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT uid FROM balances ORDER BY uid")
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows.iter().map(|r| r.get("uid")).collect())
    }
}

pub(crate) fn map_balance_row(row: &SqliteRow) -> AccountBalance {
    AccountBalance {
        uid: row.get("uid"),
        points: row.get("points"),
        xp: row.get("xp"),
        game_xp: row.get("game_xp"),
        last_spin_date: row.get("last_spin_date"),
        updated_at: row.get("updated_at"),
    }
}
