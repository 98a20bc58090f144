//! A single SQLite transaction spanning one award or spend.
//!
//! Callers must make a write their first statement (`ensure_balance`,
//! `claim_daily_play`, ...). SQLite then takes the write lock up front, so
//! concurrent sessions queue on `busy_timeout` instead of interleaving their
//! read-modify-write sequences. Dropping a session without `commit` rolls it
//! back.

use anyhow::Result;
use sqlx::{Row, Sqlite, Transaction as SqlxTransaction};

use crate::backend::domain::models::balance::AccountBalance;
use crate::backend::domain::models::game_play::GamePlayRecord;
use crate::backend::domain::models::transaction::Transaction;
use crate::backend::domain::models::voucher::VoucherRedemption;
use crate::backend::domain::models::wheel::WheelSpin;
use crate::backend::storage::connection::DbConnection;
use crate::backend::storage::repositories::balance_repository::map_balance_row;
use crate::backend::storage::repositories::transaction_repository::insert_transaction;

pub struct LedgerSession {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl LedgerSession {
    pub async fn begin(db: &DbConnection) -> Result<Self> {
        let tx = db.pool().begin().await?;
        Ok(Self { tx })
    }

    /// Create the balance row if the user has none yet
    pub async fn ensure_balance(&mut self, uid: &str, now: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO balances (uid, points, xp, game_xp, updated_at)
            VALUES (?, 0, 0, 0, ?)
            ON CONFLICT(uid) DO NOTHING
            "#,
        )
        .bind(uid)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn balance(&mut self, uid: &str) -> Result<Option<AccountBalance>> {
        let row = sqlx::query(
            r#"
            SELECT uid, points, xp, game_xp, last_spin_date, updated_at
            FROM balances
            WHERE uid = ?
            "#,
        )
        .bind(uid)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(map_balance_row))
    }

    /// Insert the (user, game, day) record. Returns false if it already existed.
    pub async fn claim_daily_play(&mut self, play: &GamePlayRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO game_plays (
                uid, game_id, date, played_at, retry_count, level, points_awarded,
                is_game_of_day, applied_multiplier, tier_multiplier,
                last_played_at, latest_points, play_count
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(uid, game_id, date) DO NOTHING
            "#,
        )
        .bind(&play.uid)
        .bind(&play.game_id)
        .bind(&play.date)
        .bind(&play.played_at)
        .bind(play.retry_count as i64)
        .bind(&play.level)
        .bind(play.points_awarded)
        .bind(play.is_game_of_day)
        .bind(play.applied_multiplier)
        .bind(play.tier_multiplier)
        .bind(&play.last_played_at)
        .bind(play.latest_points)
        .bind(play.play_count)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record a repeat completion without touching the first-play award
    pub async fn touch_repeat_play(
        &mut self,
        uid: &str,
        game_id: &str,
        date: &str,
        played_at: &str,
        latest_points: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE game_plays
            SET last_played_at = ?, latest_points = ?, play_count = play_count + 1
            WHERE uid = ? AND game_id = ? AND date = ?
            "#,
        )
        .bind(played_at)
        .bind(latest_points)
        .bind(uid)
        .bind(game_id)
        .bind(date)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Atomic increments of points and experience
    pub async fn credit(&mut self, uid: &str, points: i64, xp: i64, game_xp: i64, now: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE balances
            SET points = points + ?, xp = xp + ?, game_xp = game_xp + ?, updated_at = ?
            WHERE uid = ?
            "#,
        )
        .bind(points)
        .bind(xp)
        .bind(game_xp)
        .bind(now)
        .bind(uid)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Debit only if the balance covers the amount. Returns false otherwise.
    pub async fn try_debit(&mut self, uid: &str, amount: i64, now: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE balances
            SET points = points - ?, updated_at = ?
            WHERE uid = ? AND points >= ?
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(uid)
        .bind(amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Take today's free spin. Returns false if it was already used today.
    pub async fn claim_free_spin(&mut self, uid: &str, today: &str, now: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE balances
            SET last_spin_date = ?, updated_at = ?
            WHERE uid = ? AND (last_spin_date IS NULL OR last_spin_date <> ?)
            "#,
        )
        .bind(today)
        .bind(now)
        .bind(uid)
        .bind(today)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn append_transaction(&mut self, transaction: &Transaction) -> Result<()> {
        insert_transaction(&mut *self.tx, transaction).await
    }

    /// Add `points` to the user's total for the game and count one play
    pub async fn bump_leaderboard(
        &mut self,
        game_id: &str,
        uid: &str,
        name: &str,
        points: i64,
        played_at: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leaderboard (game_id, uid, name, total_points, plays, last_played)
            VALUES (?, ?, ?, ?, 1, ?)
            ON CONFLICT(game_id, uid) DO UPDATE SET
                name = excluded.name,
                total_points = leaderboard.total_points + excluded.total_points,
                plays = leaderboard.plays + 1,
                last_played = excluded.last_played
            "#,
        )
        .bind(game_id)
        .bind(uid)
        .bind(name)
        .bind(points)
        .bind(played_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn count_redemptions(&mut self, uid: &str, voucher_id: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM voucher_redemptions WHERE uid = ? AND voucher_id = ?",
        )
        .bind(uid)
        .bind(voucher_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.get("n"))
    }

    pub async fn insert_redemption(&mut self, redemption: &VoucherRedemption) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO voucher_redemptions (id, code, uid, voucher_id, points_spent, issued_at, expires_at, used_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&redemption.id)
        .bind(&redemption.code)
        .bind(&redemption.uid)
        .bind(&redemption.voucher_id)
        .bind(redemption.points_spent)
        .bind(&redemption.issued_at)
        .bind(&redemption.expires_at)
        .bind(&redemption.used_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn insert_spin(&mut self, spin: &WheelSpin) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wheel_spins (id, uid, prize_id, prize_kind, prize_value, was_free, points_charged, spun_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&spin.id)
        .bind(&spin.uid)
        .bind(&spin.prize_id)
        .bind(spin.prize_kind.as_str())
        .bind(spin.prize_value)
        .bind(spin.was_free)
        .bind(spin.points_charged)
        .bind(&spin.spun_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
