//! Points economy service: game rewards, a daily game rotation, voucher and
//! wheel spending, leaderboards and ledger reconciliation.

pub mod backend;
