// Repository modules
pub mod balance_repository;
pub mod game_play_repository;
pub mod leaderboard_repository;
pub mod rotation_repository;
pub mod settings_repository;
pub mod source_repository;
pub mod tier_repository;
pub mod transaction_repository;
pub mod voucher_repository;
pub mod wheel_repository;

// Re-export repository types
pub use balance_repository::BalanceRepository;
pub use game_play_repository::GamePlayRepository;
pub use leaderboard_repository::LeaderboardRepository;
pub use rotation_repository::RotationRepository;
pub use settings_repository::SettingsRepository;
pub use source_repository::SourceRepository;
pub use tier_repository::TierRepository;
pub use transaction_repository::TransactionRepository;
pub use voucher_repository::VoucherRepository;
pub use wheel_repository::WheelRepository;
