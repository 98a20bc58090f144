//! Records owned by neighbouring systems (shop, events, the legacy profile
//! document) that reconciliation reads to rebuild ledger history.

/// A shop order. Written by the order system; read-only here.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub uid: String,
    pub status: String,
    pub total: f64,
    /// Points the purchase earned, when the order system recorded it
    pub points_earned: Option<i64>,
    /// Points used to pay for (part of) the order
    pub points_spent: Option<i64>,
    pub created_at: Option<String>,
}

impl Order {
    /// Only completed or delivered orders imply ledger activity
    pub fn is_settled(&self) -> bool {
        matches!(self.status.to_ascii_lowercase().as_str(), "completed" | "delivered")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRegistration {
    pub id: String,
    pub uid: String,
    pub event_id: String,
    pub event_name: String,
    pub status: String,
    pub points_earned: Option<i64>,
    pub points_spent: Option<i64>,
    pub registered_at: Option<String>,
}

impl EventRegistration {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.status.to_ascii_lowercase().as_str(),
            "cancelled" | "canceled" | "refunded"
        )
    }
}

/// One element of the point-history array that used to be embedded in the
/// user profile. Its shape varies between app versions, so it stays raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyPointEntry {
    pub uid: String,
    pub position: i64,
    pub entry: serde_json::Value,
}
