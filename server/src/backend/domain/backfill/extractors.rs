//! Implied ledger events per source record.
//!
//! Each source collection implements [`ImpliedEventSource`]; the driver only
//! sees the resulting [`ImpliedEvent`]s and their dedup keys.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use super::dedup;
use crate::backend::domain::models::game_play::GamePlayRecord;
use crate::backend::domain::models::sources::{EventRegistration, LegacyPointEntry, Order};
use crate::backend::domain::models::transaction::{
    Transaction, TransactionMetadata, TransactionSource, TransactionType,
};
use crate::backend::domain::models::voucher::VoucherRedemption;

/// Values shared by every extractor in one run
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub uid: String,
    /// Timestamp for events whose source carries none
    pub now: String,
    pub order_points_per_currency: f64,
}

/// A ledger entry a source record implies, with the keys that identify it
#[derive(Debug, Clone)]
pub struct ImpliedEvent {
    pub key: String,
    /// Older keys an existing entry may have been recorded under
    pub aliases: Vec<String>,
    pub transaction: Transaction,
}

pub trait ImpliedEventSource {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent>;
}

#[allow(clippy::too_many_arguments)]
fn implied(
    ctx: &ExtractionContext,
    key: String,
    transaction_type: TransactionType,
    amount: i64,
    source: TransactionSource,
    description: String,
    mut metadata: TransactionMetadata,
    timestamp: Option<&str>,
) -> ImpliedEvent {
    metadata.backfilled = true;
    let timestamp = timestamp
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&ctx.now)
        .to_string();
    ImpliedEvent {
        key,
        aliases: Vec::new(),
        transaction: Transaction::new(
            &ctx.uid,
            transaction_type,
            amount,
            source,
            description,
            metadata,
            timestamp,
        ),
    }
}

impl ImpliedEventSource for Order {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
        if !self.is_settled() {
            return Vec::new();
        }
        let mut events = Vec::new();

        let (earned, estimated) = match self.points_earned {
            Some(points) => (points, false),
            None => ((self.total * ctx.order_points_per_currency).round() as i64, true),
        };
        if earned > 0 {
            events.push(implied(
                ctx,
                dedup::order_earn_key(&self.id),
                TransactionType::Earn,
                earned,
                TransactionSource::ShopPurchase,
                format!("Points earned on order {}", self.id),
                TransactionMetadata {
                    order_id: Some(self.id.clone()),
                    estimated,
                    ..Default::default()
                },
                self.created_at.as_deref(),
            ));
        }

        if let Some(spent) = self.points_spent.filter(|p| *p > 0) {
            events.push(implied(
                ctx,
                dedup::order_spend_key(&self.id),
                TransactionType::Spend,
                spent,
                TransactionSource::ShopRedemption,
                format!("Points used on order {}", self.id),
                TransactionMetadata {
                    order_id: Some(self.id.clone()),
                    ..Default::default()
                },
                self.created_at.as_deref(),
            ));
        }

        events
    }
}

impl ImpliedEventSource for EventRegistration {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
        if self.is_cancelled() {
            return Vec::new();
        }
        let mut events = Vec::new();
        let metadata = TransactionMetadata {
            registration_id: Some(self.id.clone()),
            ..Default::default()
        };

        if let Some(earned) = self.points_earned.filter(|p| *p > 0) {
            events.push(implied(
                ctx,
                dedup::event_earn_key(&self.id),
                TransactionType::Earn,
                earned,
                TransactionSource::EventRegistration,
                format!("Registered for {}", self.event_name),
                metadata.clone(),
                self.registered_at.as_deref(),
            ));
        }
        if let Some(spent) = self.points_spent.filter(|p| *p > 0) {
            events.push(implied(
                ctx,
                dedup::event_spend_key(&self.id),
                TransactionType::Spend,
                spent,
                TransactionSource::EventRedemption,
                format!("Points used for {}", self.event_name),
                metadata,
                self.registered_at.as_deref(),
            ));
        }

        events
    }
}

impl ImpliedEventSource for GamePlayRecord {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
        if self.points_awarded <= 0 {
            return Vec::new();
        }
        let (multiplier, estimated) = match self.tier_multiplier {
            Some(multiplier) => (multiplier, false),
            None => (1.0, true),
        };
        let amount = (self.points_awarded as f64 * multiplier).round() as i64;

        vec![implied(
            ctx,
            dedup::game_key(&self.game_id, &self.played_at),
            TransactionType::Earn,
            amount,
            TransactionSource::GameAward,
            format!("Completed {}", self.game_id),
            TransactionMetadata {
                game_id: Some(self.game_id.clone()),
                date: Some(self.date.clone()),
                played_at: Some(self.played_at.clone()),
                xp_earned: Some(self.points_awarded),
                multiplier: Some(multiplier),
                estimated,
                ..Default::default()
            },
            Some(&self.played_at),
        )]
    }
}

impl ImpliedEventSource for VoucherRedemption {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
        if self.points_spent <= 0 {
            return Vec::new();
        }
        let mut event = implied(
            ctx,
            dedup::voucher_spend_key(&self.id),
            TransactionType::Spend,
            self.points_spent,
            TransactionSource::RewardRedemption,
            format!("Redeemed voucher {}", self.voucher_id),
            TransactionMetadata {
                voucher_id: Some(self.voucher_id.clone()),
                redemption_id: Some(self.id.clone()),
                ..Default::default()
            },
            Some(&self.issued_at),
        );
        event.aliases.push(dedup::voucher_spend_key(&self.voucher_id));
        vec![event]
    }
}

impl ImpliedEventSource for LegacyPointEntry {
    fn implied_events(&self, ctx: &ExtractionContext) -> Vec<ImpliedEvent> {
        let Some(signed) = legacy_amount(&self.entry) else {
            return Vec::new();
        };
        let transaction_type = legacy_direction(&self.entry, signed);
        let Some(amount) = signed.checked_abs() else {
            warn!(uid = %self.uid, position = self.position, "Skipping legacy entry with out-of-range amount");
            return Vec::new();
        };
        if amount == 0 {
            return Vec::new();
        }
        let is_spend = transaction_type == TransactionType::Spend;
        let signed = if is_spend { -amount } else { amount };

        let timestamp = legacy_timestamp(&self.entry);
        let description = string_field(&self.entry, &["description", "reason", "note", "source"])
            .unwrap_or_else(|| "Legacy point history".to_string());

        let mut metadata = TransactionMetadata::default();
        let (key, source) = if let Some(order_id) = string_field(&self.entry, &["orderId", "order_id"]) {
            metadata.order_id = Some(order_id.clone());
            if is_spend {
                (dedup::order_spend_key(&order_id), TransactionSource::ShopRedemption)
            } else {
                (dedup::order_earn_key(&order_id), TransactionSource::ShopPurchase)
            }
        } else if let Some(registration_id) =
            string_field(&self.entry, &["registrationId", "registration_id"])
        {
            metadata.registration_id = Some(registration_id.clone());
            if is_spend {
                (dedup::event_spend_key(&registration_id), TransactionSource::EventRedemption)
            } else {
                (dedup::event_earn_key(&registration_id), TransactionSource::EventRegistration)
            }
        } else if let (Some(game_id), Some(played_at), false) = (
            string_field(&self.entry, &["gameId", "game_id"]),
            string_field(&self.entry, &["playedAt", "played_at"]),
            is_spend,
        ) {
            metadata.game_id = Some(game_id.clone());
            metadata.played_at = Some(played_at.clone());
            (dedup::game_key(&game_id, &played_at), TransactionSource::GameAward)
        } else if let (Some(reference), true) = (
            string_field(&self.entry, &["redemptionId", "redemption_id"])
                .or_else(|| string_field(&self.entry, &["voucherId", "voucher_id"])),
            is_spend,
        ) {
            metadata.voucher_id = string_field(&self.entry, &["voucherId", "voucher_id"]);
            metadata.redemption_id = string_field(&self.entry, &["redemptionId", "redemption_id"]);
            (dedup::voucher_spend_key(&reference), TransactionSource::RewardRedemption)
        } else {
            let key = dedup::legacy_key(self.position, timestamp.as_deref(), signed);
            metadata.legacy_key = Some(key.clone());
            (key, TransactionSource::LegacyHistory)
        };

        vec![implied(
            ctx,
            key,
            transaction_type,
            amount,
            source,
            description,
            metadata,
            timestamp.as_deref(),
        )]
    }
}

fn string_field(entry: &Value, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match entry.get(*name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Largest magnitude accepted from fractional or textual amounts
const MAX_LEGACY_AMOUNT: f64 = 1e15;

/// Signed amount from `points`, `amount` or `value`, numeric or numeric text
fn legacy_amount(entry: &Value) -> Option<i64> {
    ["points", "amount", "value"].iter().find_map(|name| match entry.get(*name) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(rounded_amount)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(rounded_amount),
        _ => None,
    })
}

fn rounded_amount(value: f64) -> Option<i64> {
    if !value.is_finite() || value.abs() > MAX_LEGACY_AMOUNT {
        return None;
    }
    Some(value.round() as i64)
}

/// Explicit type wins; otherwise a negative amount is a spend
fn legacy_direction(entry: &Value, signed: i64) -> TransactionType {
    let declared = string_field(entry, &["type", "kind", "direction"])
        .map(|t| t.to_ascii_lowercase());
    match declared.as_deref() {
        Some("spend" | "debit" | "redeem" | "redemption" | "deduct") => TransactionType::Spend,
        Some("earn" | "credit" | "award" | "bonus") => TransactionType::Earn,
        _ if signed < 0 => TransactionType::Spend,
        _ => TransactionType::Earn,
    }
}

/// RFC 3339 text, a plain date, or epoch milliseconds
fn legacy_timestamp(entry: &Value) -> Option<String> {
    for name in ["timestamp", "createdAt", "created_at", "date"] {
        match entry.get(name) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => {
                if let Some(instant) = n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis) {
                    return Some(instant.to_rfc3339());
                }
            }
            _ => {}
        }
    }
    None
}
