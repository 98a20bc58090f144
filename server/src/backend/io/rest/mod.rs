//! # REST API Interface Layer
//!
//! HTTP endpoints of the points service. Handlers verify the caller, map the
//! `shared` DTOs to domain commands and back, and return `PointsError` on
//! failure; [`errors`] turns that into a status code and `{success, error}`
//! body.

pub mod auth;
pub mod award_apis;
pub mod backfill_apis;
pub mod errors;
pub mod ledger_apis;
pub mod mappers;
pub mod rate_limit;
pub mod rotation_apis;
pub mod voucher_apis;
pub mod wheel_apis;

pub use auth::TokenAuthority;
pub use rate_limit::AwardRateLimiter;
