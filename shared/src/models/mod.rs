//! Domain models for the Inventory Management System

mod category;
mod movement;
mod product;
mod supplier;
mod user;
mod warehouse;

pub use category::*;
pub use movement::*;
pub use product::*;
pub use supplier::*;
pub use user::*;
pub use warehouse::*;
