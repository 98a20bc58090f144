use anyhow::Result;
use sqlx::Row;

use crate::backend::domain::models::leaderboard::LeaderboardEntry;
use crate::backend::storage::connection::DbConnection;

#[derive(Clone)]
pub struct LeaderboardRepository {
    db: DbConnection,
}

impl LeaderboardRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Highest totals first; earlier `last_played` wins ties
    pub async fn top_entries(&self, game_id: &str, limit: u32) -> Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT game_id, uid, name, total_points, plays, last_played
            FROM leaderboard
            WHERE game_id = ?
            ORDER BY total_points DESC, last_played ASC, uid ASC
            LIMIT ?
            "#,
        )
        .bind(game_id)
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        let entries = rows
            .iter()
            .map(|row| LeaderboardEntry {
                game_id: row.get("game_id"),
                uid: row.get("uid"),
                name: row.get("name"),
                total_points: row.get("total_points"),
                plays: row.get("plays"),
                last_played: row.get("last_played"),
            })
            .collect();

        Ok(entries)
    }
}
