use anyhow::Result;
use sqlx::Row;

use crate::backend::domain::models::tier::Tier;
use crate::backend::storage::connection::DbConnection;

#[derive(Clone)]
pub struct TierRepository {
    db: DbConnection,
}

impl TierRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list_tiers(&self) -> Result<Vec<Tier>> {
        let rows = sqlx::query("SELECT name, min_xp, multiplier FROM tiers ORDER BY min_xp ASC")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows
            .iter()
            .map(|row| Tier {
                name: row.get("name"),
                min_xp: row.get("min_xp"),
                multiplier: row.get("multiplier"),
            })
            .collect())
    }

    /// Seed the table when it is empty. Returns the number of tiers written.
    pub async fn seed_if_empty(&self, tiers: &[Tier]) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;
        let existing: i64 = sqlx::query("SELECT COUNT(*) AS n FROM tiers")
            .fetch_one(&mut *tx)
            .await?
            .get("n");
        if existing > 0 {
            return Ok(0);
        }
        for tier in tiers {
            sqlx::query("INSERT INTO tiers (name, min_xp, multiplier) VALUES (?, ?, ?)")
                .bind(&tier.name)
                .bind(tier.min_xp)
                .bind(tier.multiplier)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(tiers.len())
    }
}
