//! Business logic services

pub mod auth;
pub mod category;
pub mod movement;
pub mod product;
pub mod supplier;
pub mod warehouse;
