//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the public DTOs defined
//! in the `shared` crate to these internal types.

pub mod rewards {
    /// Input for awarding a completed game session.
    #[derive(Debug, Clone)]
    pub struct AwardGameCommand {
        pub uid: String,
        /// Name shown on the leaderboard
        pub display_name: String,
        pub game_id: String,
        pub retry: u32,
        pub level: Option<String>,
        /// Caller's default base points, used when the game has none configured
        pub points: Option<i64>,
    }

    /// Outcome of an award request. A repeat play is reported, not rejected.
    #[derive(Debug, Clone, PartialEq)]
    pub struct AwardGameResult {
        pub success: bool,
        pub awarded_points: i64,
        pub awarded_xp: i64,
        pub tier_multiplier: f64,
        pub current_tier: String,
        pub is_game_of_day: bool,
        pub applied_multiplier: i64,
        pub already_played: bool,
        pub message: String,
    }
}

pub mod rotation {
    use crate::backend::domain::models::rotation::RotationPolicy;

    /// Admin replacement of the rotation policy.
    #[derive(Debug, Clone)]
    pub struct ReplacePolicyCommand {
        pub enabled: bool,
        pub games_per_day: u32,
        pub selected_games: Vec<String>,
    }

    /// The policy as seen on a given canonical date.
    #[derive(Debug, Clone)]
    pub struct RotationSnapshot {
        pub policy: RotationPolicy,
        pub date: String,
    }

    impl RotationSnapshot {
        /// Today's games; empty while the policy is disabled
        pub fn active_games(&self) -> Vec<String> {
            if !self.policy.enabled {
                return Vec::new();
            }
            self.policy.active_games(&self.date).to_vec()
        }

        pub fn game_of_the_day(&self) -> Option<String> {
            if !self.policy.enabled {
                return None;
            }
            self.policy.game_of_the_day(&self.date).cloned()
        }
    }
}

pub mod ledger {
    use crate::backend::domain::models::balance::AccountBalance;
    use crate::backend::domain::models::tier::Tier;
    use crate::backend::domain::models::transaction::Transaction;

    /// Query parameters for listing transactions.
    #[derive(Debug, Clone, Default)]
    pub struct TransactionListQuery {
        pub after: Option<String>,
        pub limit: Option<u32>,
    }

    /// Generic pagination info returned by list queries.
    #[derive(Debug, Clone)]
    pub struct PaginationInfo {
        pub has_more: bool,
        pub next_cursor: Option<String>,
    }

    /// Result of listing transactions.
    #[derive(Debug, Clone)]
    pub struct TransactionListResult {
        pub transactions: Vec<Transaction>,
        pub pagination: PaginationInfo,
    }

    /// Balance with tier progress.
    #[derive(Debug, Clone)]
    pub struct BalanceSummary {
        pub balance: AccountBalance,
        pub current_tier: Tier,
        pub next_tier: Option<Tier>,
    }

    impl BalanceSummary {
        pub fn xp_to_next_tier(&self) -> Option<i64> {
            self.next_tier
                .as_ref()
                .map(|tier| (tier.min_xp - self.balance.xp).max(0))
        }
    }

    /// Ledger sum compared with the stored balance.
    #[derive(Debug, Clone, PartialEq)]
    pub struct LedgerAudit {
        pub uid: String,
        pub balance_points: i64,
        pub ledger_points: i64,
        pub transaction_count: usize,
        pub backfilled_count: usize,
    }

    impl LedgerAudit {
        pub fn drift(&self) -> i64 {
            self.balance_points - self.ledger_points
        }

        pub fn is_reconciled(&self) -> bool {
            self.drift() == 0
        }
    }
}

pub mod backfill {
    /// Result of one reconciliation run.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct BackfillResult {
        pub backfilled_count: usize,
        /// Implied events whose dedup key already existed
        pub skipped_count: usize,
        pub estimated_count: usize,
    }
}

pub mod spend {
    use crate::backend::domain::models::voucher::VoucherRedemption;
    use crate::backend::domain::models::wheel::{WheelPrize, WheelSpin};

    #[derive(Debug, Clone)]
    pub struct RedeemVoucherResult {
        pub redemption: VoucherRedemption,
        pub new_balance: i64,
    }

    #[derive(Debug, Clone)]
    pub struct WheelStatus {
        pub free_spin_available: bool,
        pub spin_cost: i64,
        pub balance: i64,
        pub prizes: Vec<WheelPrize>,
    }

    #[derive(Debug, Clone)]
    pub struct SpinResult {
        pub spin: WheelSpin,
        pub prize: WheelPrize,
        /// Points credited by a points prize, zero otherwise
        pub points_won: i64,
        pub new_balance: i64,
    }
}

pub mod leaderboard {
    use crate::backend::domain::models::leaderboard::LeaderboardEntry;

    #[derive(Debug, Clone)]
    pub struct RankedEntry {
        /// 1-based position
        pub rank: u32,
        pub entry: LeaderboardEntry,
    }
}
