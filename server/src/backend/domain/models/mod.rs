//! Domain models for the points economy.

pub mod balance;
pub mod error;
pub mod game_play;
pub mod identity;
pub mod leaderboard;
pub mod rotation;
pub mod sources;
pub mod tier;
pub mod transaction;
pub mod voucher;
pub mod wheel;

pub use error::{PointsError, PointsResult};
