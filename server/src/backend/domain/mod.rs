//! # Domain Module
//!
//! Business rules of the points economy, independent of the HTTP surface.
//!
//! ## Module Organization
//!
//! - **reward_service**: Points and XP for game completions, once per user, game and day
//! - **rotation_service**: Daily game rotation and the Game of the Day
//! - **voucher_service** / **wheel_service**: Spending points on codes and wheel spins
//! - **balance_service**: Balances, tier progress, ledger listing and audit
//! - **leaderboard_service**: Per-game rankings
//! - **backfill**: Rebuilding missing ledger entries from the records that imply them
//! - **tier_service**: The tier table in storage
//! - **calendar**: The canonical calendar every "per day" rule uses
//!
//! ## Business Rules
//!
//! - Every balance change has exactly one ledger entry, written in the same storage transaction
//! - Balances never go negative
//! - Timestamps and calendar days come from the server, never from the client

pub mod backfill;
pub mod balance_service;
pub mod calendar;
pub mod commands;
pub mod leaderboard_service;
pub mod models;
pub mod reward_service;
pub mod rotation_service;
pub mod tier_service;
pub mod voucher_service;
pub mod wheel_service;

pub use backfill::BackfillService;
pub use balance_service::BalanceService;
pub use calendar::CalendarService;
pub use leaderboard_service::LeaderboardService;
pub use reward_service::RewardService;
pub use rotation_service::RotationService;
pub use tier_service::TierService;
pub use voucher_service::VoucherService;
pub use wheel_service::WheelService;
