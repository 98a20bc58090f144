//! Dedup keys shared by existing ledger entries and implied events.
//!
//! A key names the originating entity, so an entry written live by the award
//! or spend path and the same event reconstructed from its source record map
//! to the same string.

use crate::backend::domain::models::transaction::{Transaction, TransactionType};

pub fn order_earn_key(order_id: &str) -> String {
    format!("ORDER_{}", order_id)
}

pub fn order_spend_key(order_id: &str) -> String {
    format!("ORDER_SPEND_{}", order_id)
}

pub fn event_earn_key(registration_id: &str) -> String {
    format!("EVENT_{}", registration_id)
}

pub fn event_spend_key(registration_id: &str) -> String {
    format!("EVENT_SPEND_{}", registration_id)
}

pub fn game_key(game_id: &str, played_at: &str) -> String {
    format!("GAME_{}_{}", game_id, played_at)
}

/// Keyed by redemption id when known, by voucher id for entries that only carry that
pub fn voucher_spend_key(id: &str) -> String {
    format!("VOUCHER_SPEND_{}", id)
}

/// Key for a legacy entry without any entity reference. The history position
/// keeps same-day entries of equal amount apart.
pub fn legacy_key(position: i64, timestamp: Option<&str>, signed_amount: i64) -> String {
    match timestamp {
        Some(timestamp) => format!("LEGACY_{}_{}_{}", position, timestamp, signed_amount),
        None => format!("LEGACY_{}_{}", position, signed_amount),
    }
}

/// Every key an existing ledger entry accounts for
pub fn keys_for_transaction(transaction: &Transaction) -> Vec<String> {
    let metadata = &transaction.metadata;
    let is_spend = transaction.transaction_type == TransactionType::Spend;
    let mut keys = Vec::new();

    if let Some(key) = &metadata.legacy_key {
        keys.push(key.clone());
    }
    if let Some(order_id) = &metadata.order_id {
        keys.push(if is_spend {
            order_spend_key(order_id)
        } else {
            order_earn_key(order_id)
        });
    }
    if let Some(registration_id) = &metadata.registration_id {
        keys.push(if is_spend {
            event_spend_key(registration_id)
        } else {
            event_earn_key(registration_id)
        });
    }
    if let (Some(game_id), Some(played_at)) = (&metadata.game_id, &metadata.played_at) {
        if !is_spend {
            keys.push(game_key(game_id, played_at));
        }
    }
    if is_spend {
        match (&metadata.redemption_id, &metadata.voucher_id) {
            (Some(redemption_id), _) => keys.push(voucher_spend_key(redemption_id)),
            (None, Some(voucher_id)) => keys.push(voucher_spend_key(voucher_id)),
            (None, None) => {}
        }
    }

    keys
}
