use anyhow::Result;
use sqlx::Row;
use std::collections::BTreeMap;

use crate::backend::domain::models::rotation::RotationPolicy;
use crate::backend::storage::connection::DbConnection;

/// Persists the rotation policy singleton and the per-day schedule
#[derive(Clone)]
pub struct RotationRepository {
    db: DbConnection,
}

impl RotationRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Load the policy with its schedule from `since` (YYYY-MM-DD) onwards.
    /// A fresh database yields a default enabled policy of
    /// `default_games_per_day` games.
    pub async fn load_policy(&self, default_games_per_day: u32, since: &str) -> Result<RotationPolicy> {
        let row = sqlx::query(
            r#"
            SELECT version, enabled, games_per_day, selected_games, last_rotation
            FROM rotation_policy
            WHERE id = 1
            "#,
        )
        .fetch_optional(self.db.pool())
        .await?;

        let mut policy = match row {
            Some(r) => {
                let selected: String = r.get("selected_games");
                RotationPolicy {
                    version: r.get::<i64, _>("version") as u32,
                    enabled: r.get("enabled"),
                    games_per_day: r.get::<i64, _>("games_per_day") as u32,
                    selected_games: serde_json::from_str(&selected)?,
                    rotation_schedule: BTreeMap::new(),
                    last_rotation: r.get("last_rotation"),
                }
            }
            None => RotationPolicy::new(default_games_per_day),
        };

        let days = sqlx::query("SELECT date, games FROM rotation_days WHERE date >= ? ORDER BY date")
            .bind(since)
            .fetch_all(self.db.pool())
            .await?;
        for day in days {
            let games: String = day.get("games");
            policy
                .rotation_schedule
                .insert(day.get("date"), serde_json::from_str(&games)?);
        }

        Ok(policy)
    }

    /// Store the policy settings (not the schedule)
    pub async fn save_policy(&self, policy: &RotationPolicy) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rotation_policy (id, version, enabled, games_per_day, selected_games, last_rotation)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                version = excluded.version,
                enabled = excluded.enabled,
                games_per_day = excluded.games_per_day,
                selected_games = excluded.selected_games,
                last_rotation = excluded.last_rotation
            "#,
        )
        .bind(policy.version as i64)
        .bind(policy.enabled)
        .bind(policy.games_per_day as i64)
        .bind(serde_json::to_string(&policy.selected_games)?)
        .bind(&policy.last_rotation)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Update only `last_rotation`, creating the singleton from `policy` if
    /// it was never stored
    pub async fn record_rotation(&self, policy: &RotationPolicy, at: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rotation_policy (id, version, enabled, games_per_day, selected_games, last_rotation)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET last_rotation = excluded.last_rotation
            "#,
        )
        .bind(policy.version as i64)
        .bind(policy.enabled)
        .bind(policy.games_per_day as i64)
        .bind(serde_json::to_string(&policy.selected_games)?)
        .bind(at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_day(&self, date: &str) -> Result<Option<Vec<String>>> {
        let row = sqlx::query("SELECT games FROM rotation_days WHERE date = ?")
            .bind(date)
            .fetch_optional(self.db.pool())
            .await?;

        match row {
            Some(r) => {
                let games: String = r.get("games");
                Ok(Some(serde_json::from_str(&games)?))
            }
            None => Ok(None),
        }
    }

    /// Write the day's games unless a non-empty list already exists.
    /// Returns false when another writer got there first.
    pub async fn insert_day_if_absent(&self, date: &str, games: &[String], generated_at: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO rotation_days (date, games, generated_at) VALUES (?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                games = excluded.games,
                generated_at = excluded.generated_at
            WHERE rotation_days.games = '[]'
            "#,
        )
        .bind(date)
        .bind(serde_json::to_string(games)?)
        .bind(generated_at)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Copy the first game of the stored `date` row into the settings value at
    /// `key` as `{date, gameId}`. The row is read by the same statement, so the
    /// value always matches the latest write for that date. Nothing is written
    /// when the day is missing or the policy is disabled.
    pub async fn refresh_day_mirror(&self, key: &str, date: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            SELECT ?, json_object('date', d.date, 'gameId', json_extract(d.games, '$[0]'))
            FROM rotation_days d
            WHERE d.date = ?
              AND COALESCE((SELECT enabled FROM rotation_policy WHERE id = 1), 1)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(date)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unconditionally overwrite one day
    pub async fn replace_day(&self, date: &str, games: &[String], generated_at: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rotation_days (date, games, generated_at) VALUES (?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                games = excluded.games,
                generated_at = excluded.generated_at
            "#,
        )
        .bind(date)
        .bind(serde_json::to_string(games)?)
        .bind(generated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
