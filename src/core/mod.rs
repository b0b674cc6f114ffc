//! Core business logic.
//!
//! Everything here is framework-agnostic: functions take a database connection (or
//! plain values) and return structured data. The HTTP layer in [`crate::api`] only
//! translates requests into these calls.

pub mod allocation;
pub mod auth;
pub mod budget;
pub mod catalog;
pub mod expense;
pub mod income;
pub mod ledger;
pub mod period;
pub mod report;
pub mod session;
