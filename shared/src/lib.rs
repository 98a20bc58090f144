use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body for `POST /api/games/award`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardGameRequest {
    /// Identifier of the completed game (required)
    pub game_id: Option<String>,
    /// Number of retries the player needed before completing
    #[serde(default)]
    pub retry: Option<u32>,
    /// Difficulty level: easy, medium, hard or expert
    #[serde(default)]
    pub level: Option<String>,
    /// Caller-supplied default base points, used when the game has no configured value
    #[serde(default)]
    pub points: Option<i64>,
}

/// Response body for `POST /api/games/award`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardGameResponse {
    pub success: bool,
    /// Currency credited to the balance (tier-adjusted)
    pub awarded_points: i64,
    /// Experience credited (never tier-adjusted)
    #[serde(rename = "awardedXP")]
    pub awarded_xp: i64,
    pub tier_multiplier: f64,
    pub current_tier: String,
    pub is_game_of_day: bool,
    /// Game-of-the-Day factor that was applied (1 or 2)
    pub applied_multiplier: i64,
    /// True when the game had already been completed today and nothing was granted
    pub already_played: bool,
    pub message: String,
}

/// Request body for `POST /api/rotation`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRotationPolicyRequest {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub games_per_day: u32,
    #[serde(default)]
    pub selected_games: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// Rotation policy as returned by the rotation endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPolicyResponse {
    pub version: u32,
    pub enabled: bool,
    pub games_per_day: u32,
    pub selected_games: Vec<String>,
    /// Date (YYYY-MM-DD) → ordered active game ids
    pub rotation_schedule: BTreeMap<String, Vec<String>>,
    /// Server date the response was computed for
    pub date: String,
    pub active_games: Vec<String>,
    pub game_of_the_day: Option<String>,
    pub last_rotation: Option<String>,
}

/// Response body for `POST /api/backfill`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResponse {
    pub success: bool,
    pub backfilled_count: usize,
    pub message: String,
}

/// Tier description shared by several responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDto {
    pub name: String,
    #[serde(rename = "minXP")]
    pub min_xp: i64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierListResponse {
    pub tiers: Vec<TierDto>,
}

/// Response body for `GET /api/balance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub uid: String,
    pub points: i64,
    pub xp: i64,
    pub game_xp: i64,
    pub current_tier: TierDto,
    pub next_tier: Option<TierDto>,
    /// XP still needed to reach the next tier (0 at the top tier)
    #[serde(rename = "xpToNextTier")]
    pub xp_to_next_tier: i64,
}

/// Ledger entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Earn,
    Spend,
}

/// A single ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive magnitude; direction comes from `type`
    pub amount: i64,
    pub source: String,
    pub description: String,
    pub metadata: serde_json::Value,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub pagination: PaginationInfo,
}

/// Response body for `GET /api/ledger/audit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAuditResponse {
    pub balance_points: i64,
    pub ledger_points: i64,
    /// `balance_points - ledger_points`; zero when the ledger reconciles
    pub drift: i64,
    pub transaction_count: usize,
    pub backfilled_count: usize,
    pub reconciled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntryDto {
    pub rank: usize,
    pub uid: String,
    pub name: String,
    pub total_points: i64,
    pub plays: i64,
    pub last_played: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub game_id: String,
    pub entries: Vec<LeaderboardEntryDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherDto {
    pub id: String,
    pub name: String,
    pub points_cost: i64,
    pub discount_type: String,
    pub discount_value: f64,
    pub validity_days: u32,
    pub per_user_limit: Option<u32>,
    pub min_order_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherListResponse {
    pub vouchers: Vec<VoucherDto>,
}

/// Response body for `POST /api/vouchers/:voucher_id/redeem`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemVoucherResponse {
    pub success: bool,
    pub code: String,
    pub voucher_id: String,
    pub points_spent: i64,
    pub expires_at: String,
    pub new_balance: i64,
}

/// Response body for `POST /api/vouchers/redemptions/:code/consume`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeRedemptionResponse {
    pub success: bool,
    pub code: String,
    pub voucher_id: String,
    pub used_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelPrizeDto {
    pub id: String,
    pub label: String,
    pub kind: String,
    pub value: i64,
}

/// Response body for `GET /api/wheel`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelStatusResponse {
    pub free_spin_available: bool,
    pub spin_cost: i64,
    pub balance: i64,
    pub prizes: Vec<WheelPrizeDto>,
}

/// Response body for `POST /api/wheel/spin`.
/// The client animates toward `prize.id`; it never chooses the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSpinResponse {
    pub success: bool,
    pub prize: WheelPrizeDto,
    pub was_free: bool,
    pub points_charged: i64,
    pub points_won: i64,
    pub new_balance: i64,
}

/// Error body returned by every endpoint on failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}
