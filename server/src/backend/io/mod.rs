//! # IO Module
//!
//! Adapter layer between HTTP clients and the domain services.
//!
//! ## Key Responsibilities
//!
//! - **API Endpoints**: Axum handlers under `/api`
//! - **Identity**: Bearer token verification and the admin check
//! - **Admission Control**: Per-identity rate limiting of the earn path
//! - **Error Translation**: Domain errors to HTTP status codes

pub mod rest;

pub use rest::*;
