//! Shared types and models for the Inventory Management System
//!
//! This crate contains the domain model, the stock-ledger replay logic, and
//! validation helpers used by the backend. It is deliberately free of any
//! persistence or HTTP dependencies so the ledger rules stay pure and
//! testable in isolation.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
