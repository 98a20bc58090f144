use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::backend::domain::models::voucher::{Voucher, VoucherRedemption};
use crate::backend::storage::connection::DbConnection;

/// Voucher catalog and issued redemption codes
#[derive(Clone)]
pub struct VoucherRepository {
    db: DbConnection,
}

impl VoucherRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Insert or refresh a catalog entry
    pub async fn upsert_voucher(&self, voucher: &Voucher) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO vouchers (id, name, points_cost, discount_type, discount_value, validity_days, active, per_user_limit, min_order_value)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                points_cost = excluded.points_cost,
                discount_type = excluded.discount_type,
                discount_value = excluded.discount_value,
                validity_days = excluded.validity_days,
                active = excluded.active,
                per_user_limit = excluded.per_user_limit,
                min_order_value = excluded.min_order_value
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.name)
        .bind(voucher.points_cost)
        .bind(voucher.discount_type.as_str())
        .bind(voucher.discount_value)
        .bind(voucher.validity_days as i64)
        .bind(voucher.active)
        .bind(voucher.per_user_limit.map(|l| l as i64))
        .bind(voucher.min_order_value)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn get_voucher(&self, voucher_id: &str) -> Result<Option<Voucher>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, points_cost, discount_type, discount_value, validity_days, active, per_user_limit, min_order_value
            FROM vouchers
            WHERE id = ?
            "#,
        )
        .bind(voucher_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(map_voucher_row).transpose()
    }

    pub async fn list_active_vouchers(&self) -> Result<Vec<Voucher>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, points_cost, discount_type, discount_value, validity_days, active, per_user_limit, min_order_value
            FROM vouchers
            WHERE active = TRUE
            ORDER BY points_cost ASC, id ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_voucher_row).collect()
    }

    pub async fn get_redemption_by_code(&self, code: &str) -> Result<Option<VoucherRedemption>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, uid, voucher_id, points_spent, issued_at, expires_at, used_at
            FROM voucher_redemptions
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.as_ref().map(map_redemption_row))
    }

    /// Mark an unused code as used. Returns false if it was already consumed.
    pub async fn mark_redemption_used(&self, code: &str, uid: &str, used_at: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE voucher_redemptions
            SET used_at = ?
            WHERE code = ? AND uid = ? AND used_at IS NULL
            "#,
        )
        .bind(used_at)
        .bind(code)
        .bind(uid)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// A user's redemptions, oldest first
    pub async fn list_redemptions(&self, uid: &str) -> Result<Vec<VoucherRedemption>> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, uid, voucher_id, points_spent, issued_at, expires_at, used_at
            FROM voucher_redemptions
            WHERE uid = ?
            ORDER BY issued_at ASC
            "#,
        )
        .bind(uid)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(map_redemption_row).collect())
    }
}

fn map_voucher_row(row: &SqliteRow) -> Result<Voucher> {
    let discount_type: String = row.get("discount_type");
    Ok(Voucher {
        id: row.get("id"),
        name: row.get("name"),
        points_cost: row.get("points_cost"),
        discount_type: discount_type.parse()?,
        discount_value: row.get("discount_value"),
        validity_days: row.get::<i64, _>("validity_days") as u32,
        active: row.get("active"),
        per_user_limit: row.get::<Option<i64>, _>("per_user_limit").map(|l| l as u32),
        min_order_value: row.get("min_order_value"),
    })
}

pub(crate) fn map_redemption_row(row: &SqliteRow) -> VoucherRedemption {
    VoucherRedemption {
        id: row.get("id"),
        code: row.get("code"),
        uid: row.get("uid"),
        voucher_id: row.get("voucher_id"),
        points_spent: row.get("points_spent"),
        issued_at: row.get("issued_at"),
        expires_at: row.get("expires_at"),
        used_at: row.get("used_at"),
    }
}
