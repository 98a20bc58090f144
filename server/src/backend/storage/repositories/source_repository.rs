use anyhow::Result;
use sqlx::Row;

use crate::backend::domain::models::sources::{EventRegistration, LegacyPointEntry, Order};
use crate::backend::storage::connection::DbConnection;

/// Read access to the collections owned by the shop, the event system and
/// the legacy profile history. Writers live outside this service; the
/// `store_*` methods exist for imports and fixtures.
#[derive(Clone)]
pub struct SourceRepository {
    db: DbConnection,
}

impl SourceRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn list_orders(&self, uid: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, uid, status, total, points_earned, points_spent, created_at
            FROM orders
            WHERE uid = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(uid)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| Order {
                id: row.get("id"),
                uid: row.get("uid"),
                status: row.get("status"),
                total: row.get("total"),
                points_earned: row.get("points_earned"),
                points_spent: row.get("points_spent"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    pub async fn list_registrations(&self, uid: &str) -> Result<Vec<EventRegistration>> {
        let rows = sqlx::query(
            r#"
            SELECT id, uid, event_id, event_name, status, points_earned, points_spent, registered_at
            FROM event_registrations
            WHERE uid = ?
            ORDER BY registered_at ASC, id ASC
            "#,
        )
        .bind(uid)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| EventRegistration {
                id: row.get("id"),
                uid: row.get("uid"),
                event_id: row.get("event_id"),
                event_name: row.get("event_name"),
                status: row.get("status"),
                points_earned: row.get("points_earned"),
                points_spent: row.get("points_spent"),
                registered_at: row.get("registered_at"),
            })
            .collect())
    }

    /// Legacy history in its original array order. Rows that are not valid
    /// JSON are skipped with a warning.
    pub async fn list_legacy_entries(&self, uid: &str) -> Result<Vec<LegacyPointEntry>> {
        let rows = sqlx::query(
            "SELECT uid, position, entry FROM legacy_point_history WHERE uid = ? ORDER BY position ASC",
        )
        .bind(uid)
        .fetch_all(self.db.pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("entry");
            let position: i64 = row.get("position");
            match serde_json::from_str(&raw) {
                Ok(entry) => entries.push(LegacyPointEntry {
                    uid: row.get("uid"),
                    position,
                    entry,
                }),
                Err(e) => tracing::warn!(uid, position, "Skipping unreadable legacy entry: {}", e),
            }
        }
        Ok(entries)
    }

    pub async fn store_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO orders (id, uid, status, total, points_earned, points_spent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.uid)
        .bind(&order.status)
        .bind(order.total)
        .bind(order.points_earned)
        .bind(order.points_spent)
        .bind(&order.created_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn store_registration(&self, registration: &EventRegistration) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO event_registrations (id, uid, event_id, event_name, status, points_earned, points_spent, registered_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&registration.id)
        .bind(&registration.uid)
        .bind(&registration.event_id)
        .bind(&registration.event_name)
        .bind(&registration.status)
        .bind(registration.points_earned)
        .bind(registration.points_spent)
        .bind(&registration.registered_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn store_legacy_entry(&self, entry: &LegacyPointEntry) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO legacy_point_history (uid, position, entry) VALUES (?, ?, ?)",
        )
        .bind(&entry.uid)
        .bind(entry.position)
        .bind(serde_json::to_string(&entry.entry)?)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }
}
