use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::backend::domain::models::game_play::GamePlayRecord;
use crate::backend::storage::connection::DbConnection;

#[derive(Clone)]
pub struct GamePlayRepository {
    db: DbConnection,
}

const PLAY_COLUMNS: &str = "uid, game_id, date, played_at, retry_count, level, points_awarded, \
     is_game_of_day, applied_multiplier, tier_multiplier, last_played_at, latest_points, play_count";

impl GamePlayRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// The (user, game, day) record, if the game was completed that day
    pub async fn get_play(&self, uid: &str, game_id: &str, date: &str) -> Result<Option<GamePlayRecord>> {
        let query = format!(
            "SELECT {} FROM game_plays WHERE uid = ? AND game_id = ? AND date = ?",
            PLAY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(uid)
            .bind(game_id)
            .bind(date)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(map_play_row))
    }

    /// All plays of a user, oldest first
    pub async fn list_plays(&self, uid: &str) -> Result<Vec<GamePlayRecord>> {
        let query = format!(
            "SELECT {} FROM game_plays WHERE uid = ? ORDER BY played_at ASC, game_id ASC",
            PLAY_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(uid)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.iter().map(map_play_row).collect())
    }
}

fn map_play_row(row: &SqliteRow) -> GamePlayRecord {
    GamePlayRecord {
        uid: row.get("uid"),
        game_id: row.get("game_id"),
        date: row.get("date"),
        played_at: row.get("played_at"),
        retry_count: row.get::<i64, _>("retry_count").max(0) as u32,
        level: row.get("level"),
        points_awarded: row.get("points_awarded"),
        is_game_of_day: row.get("is_game_of_day"),
        applied_multiplier: row.get("applied_multiplier"),
        tier_multiplier: row.get("tier_multiplier"),
        last_played_at: row.get("last_played_at"),
        latest_points: row.get("latest_points"),
        play_count: row.get("play_count"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_and_list_plays() {
        let db = DbConnection::init_test().await.unwrap();
        for (game, date, at) in [
            ("chess", "2025-03-02", "2025-03-02T09:00:00+00:00"),
            ("go", "2025-03-01", "2025-03-01T18:00:00+00:00"),
        ] {
            sqlx::query(
                r#"
                INSERT INTO game_plays (uid, game_id, date, played_at, points_awarded, is_game_of_day, applied_multiplier)
                VALUES ('alice', ?, ?, ?, 12, FALSE, 1)
                "#,
            )
            .bind(game)
            .bind(date)
            .bind(at)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let repo = GamePlayRepository::new(db);
        let play = repo.get_play("alice", "chess", "2025-03-02").await.unwrap().unwrap();
        assert_eq!(play.points_awarded, 12);
        assert_eq!(play.tier_multiplier, None);
        assert_eq!(play.play_count, 1);
        assert!(repo.get_play("alice", "chess", "2025-03-01").await.unwrap().is_none());

        let plays = repo.list_plays("alice").await.unwrap();
        assert_eq!(
            plays.iter().map(|p| p.game_id.as_str()).collect::<Vec<_>>(),
            vec!["go", "chess"]
        );
    }
}
