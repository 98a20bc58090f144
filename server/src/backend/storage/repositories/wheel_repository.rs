use anyhow::Result;
use sqlx::Row;

use crate::backend::domain::models::wheel::WheelSpin;
use crate::backend::storage::connection::DbConnection;

#[derive(Clone)]
pub struct WheelRepository {
    db: DbConnection,
}

impl WheelRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Most recent spins first
    pub async fn list_spins(&self, uid: &str, limit: u32) -> Result<Vec<WheelSpin>> {
        let rows = sqlx::query(
            r#"
            SELECT id, uid, prize_id, prize_kind, prize_value, was_free, points_charged, spun_at
            FROM wheel_spins
            WHERE uid = ?
            ORDER BY ROWID DESC
            LIMIT ?
            "#,
        )
        .bind(uid)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.get("prize_kind");
                Ok(WheelSpin {
                    id: row.get("id"),
                    uid: row.get("uid"),
                    prize_id: row.get("prize_id"),
                    prize_kind: kind.parse()?,
                    prize_value: row.get("prize_value"),
                    was_free: row.get("was_free"),
                    points_charged: row.get("points_charged"),
                    spun_at: row.get("spun_at"),
                })
            })
            .collect()
    }
}
