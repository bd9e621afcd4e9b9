//! Warehouse model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A physical warehouse
///
/// Warehouses own stock movements as source (and optionally as transfer
/// destination); an inactive warehouse rejects new movements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub max_capacity: Option<i32>,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
