//! Domain model for ledger entries.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Earn,
    Spend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Earn => "EARN",
            TransactionType::Spend => "SPEND",
        }
    }
}

impl FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "EARN" => Ok(TransactionType::Earn),
            "SPEND" => Ok(TransactionType::Spend),
            other => Err(anyhow!("Unknown transaction type: {}", other)),
        }
    }
}

/// What caused a balance change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    GameAward,
    ShopPurchase,
    ShopRedemption,
    EventRegistration,
    EventRedemption,
    RewardRedemption,
    WheelSpin,
    WheelPrize,
    LegacyHistory,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::GameAward => "game_award",
            TransactionSource::ShopPurchase => "shop_purchase",
            TransactionSource::ShopRedemption => "shop_redemption",
            TransactionSource::EventRegistration => "event_registration",
            TransactionSource::EventRedemption => "event_redemption",
            TransactionSource::RewardRedemption => "reward_redemption",
            TransactionSource::WheelSpin => "wheel_spin",
            TransactionSource::WheelPrize => "wheel_prize",
            TransactionSource::LegacyHistory => "legacy_history",
        }
    }
}

impl fmt::Display for TransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let source = match s {
            "game_award" => TransactionSource::GameAward,
            "shop_purchase" => TransactionSource::ShopPurchase,
            "shop_redemption" => TransactionSource::ShopRedemption,
            "event_registration" => TransactionSource::EventRegistration,
            "event_redemption" => TransactionSource::EventRedemption,
            "reward_redemption" => TransactionSource::RewardRedemption,
            "wheel_spin" => TransactionSource::WheelSpin,
            "wheel_prize" => TransactionSource::WheelPrize,
            "legacy_history" => TransactionSource::LegacyHistory,
            other => return Err(anyhow!("Unknown transaction source: {}", other)),
        };
        Ok(source)
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Originating-entity references carried by a ledger entry.
///
/// These ids double as the dedup keys reconciliation relies on, so every
/// writer must fill in the id of the entity that caused the entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub played_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voucher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_key: Option<String>,
    #[serde(rename = "xpEarned", skip_serializing_if = "Option::is_none")]
    pub xp_earned: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
    #[serde(skip_serializing_if = "is_false")]
    pub backfilled: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub estimated: bool,
}

impl TransactionMetadata {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse stored metadata. Entries written by older code may carry
    /// unexpected shapes; anything unreadable degrades to empty metadata.
    pub fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// An append-only ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Format: "txn::<earn|spend>::<uuid>"
    pub id: String,
    pub uid: String,
    pub transaction_type: TransactionType,
    /// Positive magnitude
    pub amount: i64,
    pub source: TransactionSource,
    pub description: String,
    pub metadata: TransactionMetadata,
    /// RFC 3339
    pub timestamp: String,
}

impl Transaction {
    pub fn generate_id(transaction_type: TransactionType) -> String {
        let kind = match transaction_type {
            TransactionType::Earn => "earn",
            TransactionType::Spend => "spend",
        };
        format!("txn::{}::{}", kind, uuid::Uuid::new_v4().simple())
    }

    pub fn new(
        uid: &str,
        transaction_type: TransactionType,
        amount: i64,
        source: TransactionSource,
        description: impl Into<String>,
        metadata: TransactionMetadata,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::generate_id(transaction_type),
            uid: uid.to_string(),
            transaction_type,
            amount,
            source,
            description: description.into(),
            metadata,
            timestamp: timestamp.into(),
        }
    }

    /// Amount with its direction applied (EARN positive, SPEND negative)
    pub fn signed_amount(&self) -> i64 {
        match self.transaction_type {
            TransactionType::Earn => self.amount,
            TransactionType::Spend => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_encodes_direction() {
        assert!(Transaction::generate_id(TransactionType::Earn).starts_with("txn::earn::"));
        assert!(Transaction::generate_id(TransactionType::Spend).starts_with("txn::spend::"));
    }

    #[test]
    fn test_source_round_trips_through_str() {
        for source in [
            TransactionSource::GameAward,
            TransactionSource::RewardRedemption,
            TransactionSource::LegacyHistory,
        ] {
            assert_eq!(source.as_str().parse::<TransactionSource>().unwrap(), source);
        }
        assert!("payment".parse::<TransactionSource>().is_err());
    }

    #[test]
    fn test_metadata_skips_empty_fields() {
        let metadata = TransactionMetadata {
            game_id: Some("chess".to_string()),
            xp_earned: Some(30),
            ..Default::default()
        };
        let json = metadata.to_json().unwrap();
        assert_eq!(json, r#"{"gameId":"chess","xpEarned":30}"#);
    }

    #[test]
    fn test_metadata_tolerates_foreign_shapes() {
        let parsed = TransactionMetadata::from_json(r#"{"orderId":"o-1","somethingElse":[1,2]}"#);
        assert_eq!(parsed.order_id.as_deref(), Some("o-1"));

        let garbage = TransactionMetadata::from_json("not json");
        assert_eq!(garbage, TransactionMetadata::default());
    }

    #[test]
    fn test_signed_amount() {
        let spend = Transaction::new(
            "u1",
            TransactionType::Spend,
            50,
            TransactionSource::WheelSpin,
            "Wheel spin",
            TransactionMetadata::default(),
            "2025-01-01T00:00:00+00:00",
        );
        assert_eq!(spend.signed_amount(), -50);
    }
}
