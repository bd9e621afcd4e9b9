//! HTTP request handlers

pub mod auth;
pub mod categories;
pub mod health;
pub mod movements;
pub mod products;
pub mod suppliers;
pub mod users;
pub mod warehouses;

pub use health::health_check;
