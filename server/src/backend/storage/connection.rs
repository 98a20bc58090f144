use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// The database URL for the production database
pub const DATABASE_URL: &str = "sqlite:points.db";

/// DbConnection manages the shared SQLite pool and schema
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Self::setup_schema(&pool).await?;
        info!("Database ready at {}", url);

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // A single connection keeps the shared in-memory database alive for the test
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("sqlite:file:memdb_{}?mode=memory&cache=shared", test_id);
        let options = SqliteConnectOptions::from_str(&db_url)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::setup_schema(&pool).await?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS balances (
                uid TEXT PRIMARY KEY,
                points INTEGER NOT NULL DEFAULT 0,
                xp INTEGER NOT NULL DEFAULT 0,
                game_xp INTEGER NOT NULL DEFAULT 0,
                last_spin_date TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS game_plays (
                uid TEXT NOT NULL,
                game_id TEXT NOT NULL,
                date TEXT NOT NULL,
                played_at TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                level TEXT,
                points_awarded INTEGER NOT NULL,
                is_game_of_day BOOLEAN NOT NULL DEFAULT FALSE,
                applied_multiplier INTEGER NOT NULL DEFAULT 1,
                tier_multiplier REAL,
                last_played_at TEXT,
                latest_points INTEGER,
                play_count INTEGER NOT NULL DEFAULT 1,
                PRIMARY KEY (uid, game_id, date)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('EARN', 'SPEND')),
                amount INTEGER NOT NULL,
                source TEXT NOT NULL,
                description TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_uid
            ON transactions(uid);
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS leaderboard (
                game_id TEXT NOT NULL,
                uid TEXT NOT NULL,
                name TEXT NOT NULL,
                total_points INTEGER NOT NULL DEFAULT 0,
                plays INTEGER NOT NULL DEFAULT 0,
                last_played TEXT NOT NULL,
                PRIMARY KEY (game_id, uid)
            );
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_leaderboard_rank
            ON leaderboard(game_id, total_points DESC);
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tiers (
                name TEXT PRIMARY KEY,
                min_xp INTEGER NOT NULL UNIQUE,
                multiplier REAL NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rotation_policy (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL DEFAULT 1,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                games_per_day INTEGER NOT NULL,
                selected_games TEXT NOT NULL DEFAULT '[]',
                last_rotation TEXT
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS rotation_days (
                date TEXT PRIMARY KEY,
                games TEXT NOT NULL,
                generated_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS vouchers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                points_cost INTEGER NOT NULL,
                discount_type TEXT NOT NULL,
                discount_value REAL NOT NULL,
                validity_days INTEGER NOT NULL,
                active BOOLEAN NOT NULL DEFAULT TRUE,
                per_user_limit INTEGER,
                min_order_value REAL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS voucher_redemptions (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                uid TEXT NOT NULL,
                voucher_id TEXT NOT NULL,
                points_spent INTEGER NOT NULL,
                issued_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                used_at TEXT
            );
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_voucher_redemptions_uid
            ON voucher_redemptions(uid, voucher_id);
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS wheel_spins (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                prize_id TEXT NOT NULL,
                prize_kind TEXT NOT NULL,
                prize_value INTEGER NOT NULL,
                was_free BOOLEAN NOT NULL,
                points_charged INTEGER NOT NULL,
                spun_at TEXT NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                status TEXT NOT NULL,
                total REAL NOT NULL DEFAULT 0,
                points_earned INTEGER,
                points_spent INTEGER,
                created_at TEXT
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS event_registrations (
                id TEXT PRIMARY KEY,
                uid TEXT NOT NULL,
                event_id TEXT NOT NULL,
                event_name TEXT NOT NULL,
                status TEXT NOT NULL,
                points_earned INTEGER,
                points_spent INTEGER,
                registered_at TEXT
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS legacy_point_history (
                uid TEXT NOT NULL,
                position INTEGER NOT NULL,
                entry TEXT NOT NULL,
                PRIMARY KEY (uid, position)
            );
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_schema_is_created() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let tables: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        for expected in ["balances", "game_plays", "transactions", "leaderboard", "rotation_days"] {
            assert!(tables.contains(&expected.to_string()), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_test_databases_are_isolated() {
        let first = DbConnection::init_test().await.unwrap();
        let second = DbConnection::init_test().await.unwrap();
        sqlx::query("INSERT INTO settings (key, value) VALUES ('k', 'v')")
            .execute(first.pool())
            .await
            .unwrap();
        let row = sqlx::query("SELECT COUNT(*) AS n FROM settings")
            .fetch_one(second.pool())
            .await
            .unwrap();
        assert_eq!(row.get::<i64, _>("n"), 0);
    }
}
