//! Product catalog model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Discontinued => "discontinued",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "inactive" => Ok(ProductStatus::Inactive),
            "discontinued" => Ok(ProductStatus::Discontinued),
            _ => Err("Unknown product status"),
        }
    }
}

/// A product in the catalog
///
/// Stock thresholds are compared against derived stock; the product itself
/// never stores a quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub minimum_stock: i32,
    pub maximum_stock: i32,
    pub status: ProductStatus,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// True when derived stock has fallen to or below the minimum threshold
    pub fn is_low_stock(&self, current_stock: i64) -> bool {
        current_stock <= i64::from(self.minimum_stock)
    }

    /// True when derived stock has reached or exceeded the maximum threshold
    pub fn is_over_stock(&self, current_stock: i64) -> bool {
        current_stock >= i64::from(self.maximum_stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(min: i32, max: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            sku: "WID-001".into(),
            name: "Widget".into(),
            description: None,
            price: Decimal::from(10),
            cost: Decimal::from(4),
            minimum_stock: min,
            maximum_stock: max,
            status: ProductStatus::Active,
            category_id: Uuid::new_v4(),
            supplier_id: None,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn threshold_predicates_use_derived_stock() {
        let p = product(5, 100);
        assert!(p.is_low_stock(5));
        assert!(p.is_low_stock(0));
        assert!(!p.is_low_stock(6));
        assert!(p.is_over_stock(100));
        assert!(!p.is_over_stock(99));
    }
}
