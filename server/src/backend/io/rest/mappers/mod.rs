//! Conversions between domain types and the wire DTOs in `shared`.

pub mod rotation_mapper;
pub mod spend_mapper;
pub mod tier_mapper;
pub mod transaction_mapper;

pub use rotation_mapper::RotationMapper;
pub use spend_mapper::SpendMapper;
pub use tier_mapper::TierMapper;
pub use transaction_mapper::TransactionMapper;
