//! # Storage Module
//!
//! Persistence for the points economy: balances, the append-only ledger,
//! daily game records, rotation schedule, leaderboard, vouchers, wheel spins
//! and the read-only collections reconciliation draws from.
//!
//! ## Layout
//!
//! - **connection**: the shared SQLite pool and schema setup
//! - **repositories**: one repository per table family, used for reads and
//!   for writes that stand alone
//! - **ledger_session**: one storage transaction covering a whole award or
//!   spend, so balance, ledger, game record and leaderboard move together

pub mod connection;
pub mod ledger_session;
pub mod repositories;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use ledger_session::LedgerSession;
pub use repositories::{
    BalanceRepository, GamePlayRepository, LeaderboardRepository, RotationRepository,
    SettingsRepository, SourceRepository, TierRepository, TransactionRepository,
    VoucherRepository, WheelRepository,
};
