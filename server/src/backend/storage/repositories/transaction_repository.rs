use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use crate::backend::domain::models::transaction::{Transaction, TransactionMetadata};
use crate::backend::storage::connection::DbConnection;

/// Repository for the append-only ledger. There is deliberately no update
/// or delete operation.
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Append one transaction
    pub async fn store_transaction(&self, transaction: &Transaction) -> Result<()> {
        insert_transaction(self.db.pool(), transaction).await
    }

    /// Append a batch inside one storage transaction
    pub async fn store_batch(&self, transactions: &[Transaction]) -> Result<usize> {
        if transactions.is_empty() {
            return Ok(0);
        }
        let mut tx = self.db.pool().begin().await?;
        for transaction in transactions {
            insert_transaction(&mut *tx, transaction).await?;
        }
        tx.commit().await?;
        Ok(transactions.len())
    }

    /// List a user's transactions newest first, paginated by transaction id
    pub async fn list_transactions(
        &self,
        uid: &str,
        limit: u32,
        after_id: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let query = if let Some(after_id) = after_id {
            sqlx::query(
                r#"
                SELECT id, uid, type, amount, source, description, metadata, timestamp
                FROM transactions
                WHERE uid = ? AND ROWID < (
                    SELECT ROWID FROM transactions WHERE id = ?
                )
                ORDER BY ROWID DESC
                LIMIT ?
                "#,
            )
            .bind(uid)
            .bind(after_id)
            .bind(limit as i64)
        } else {
            sqlx::query(
                r#"
                SELECT id, uid, type, amount, source, description, metadata, timestamp
                FROM transactions
                WHERE uid = ?
                ORDER BY ROWID DESC
                LIMIT ?
                "#,
            )
            .bind(uid)
            .bind(limit as i64)
        };

        let rows = query.fetch_all(self.db.pool()).await?;
        rows.iter().map(map_transaction_row).collect()
    }

    /// Every transaction of a user in insertion order
    pub async fn get_all_transactions(&self, uid: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, uid, type, amount, source, description, metadata, timestamp
            FROM transactions
            WHERE uid = ?
            ORDER BY ROWID ASC
            "#,
        )
        .bind(uid)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(map_transaction_row).collect()
    }
}

pub(crate) async fn insert_transaction<'e, E>(executor: E, transaction: &Transaction) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (id, uid, type, amount, source, description, metadata, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.uid)
    .bind(transaction.transaction_type.as_str())
    .bind(transaction.amount)
    .bind(transaction.source.as_str())
    .bind(&transaction.description)
    .bind(transaction.metadata.to_json()?)
    .bind(&transaction.timestamp)
    .execute(executor)
    .await?;
    Ok(())
}

fn map_transaction_row(row: &SqliteRow) -> Result<Transaction> {
    let transaction_type: String = row.get("type");
    let source: String = row.get("source");
    let metadata: String = row.get("metadata");
    Ok(Transaction {
        id: row.get("id"),
        uid: row.get("uid"),
        transaction_type: transaction_type.parse()?,
        amount: row.get("amount"),
        source: source.parse()?,
        description: row.get("description"),
        metadata: TransactionMetadata::from_json(&metadata),
        timestamp: row.get("timestamp"),
    })
}
