//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{signed_quantity, MovementType, Product, ProductStatus, StockLine};
use shared::types::{PaginatedResponse, Pagination};
use shared::validation::{validate_name, validate_sku};

use crate::error::{AppError, AppResult};

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub minimum_stock: i32,
    pub maximum_stock: i32,
    pub category_id: Uuid,
    pub supplier_id: Option<Uuid>,
}

/// Input for updating a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub minimum_stock: Option<i32>,
    pub maximum_stock: Option<i32>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// Query parameters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Per-warehouse stock for a product
#[derive(Debug, Serialize)]
pub struct WarehouseStock {
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub quantity: i64,
}

/// Stock breakdown for a product across warehouses
#[derive(Debug, Serialize)]
pub struct ProductStockBreakdown {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub total_stock: i64,
    pub minimum_stock: i32,
    pub maximum_stock: i32,
    pub is_low_stock: bool,
    pub is_over_stock: bool,
    pub warehouses: Vec<WarehouseStock>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    cost: Decimal,
    minimum_stock: i32,
    maximum_stock: i32,
    status: String,
    category_id: Uuid,
    supplier_id: Option<Uuid>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ProductStockLineRow {
    movement_type: String,
    warehouse_id: Uuid,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
}

const PRODUCT_COLUMNS: &str = "id, sku, name, description, price, cost, minimum_stock, \
     maximum_stock, status, category_id, supplier_id, is_deleted, created_at, updated_at";

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List products with optional filters
    pub async fn list_products(
        &self,
        query: ProductListQuery,
    ) -> AppResult<PaginatedResponse<Product>> {
        let pagination = Pagination {
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(20),
        }
        .normalized();

        if let Some(ref status) = query.status {
            ProductStatus::from_str(status).map_err(|m| AppError::Validation {
                field: "status".to_string(),
                message: m.to_string(),
            })?;
        }

        let search_pattern = query.search.as_ref().map(|s| format!("%{}%", s.trim()));

        const WHERE_CLAUSE: &str = r#"
            WHERE is_deleted = false
              AND ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::uuid IS NULL OR category_id = $2)
              AND ($3::text IS NULL OR status = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM products {}",
            WHERE_CLAUSE
        ))
        .bind(&search_pattern)
        .bind(query.category_id)
        .bind(&query.status)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products {} ORDER BY name ASC LIMIT $4 OFFSET $5",
            PRODUCT_COLUMNS, WHERE_CLAUSE
        ))
        .bind(&search_pattern)
        .bind(query.category_id)
        .bind(&query.status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let products = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(products, &pagination, total as u64))
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1 AND is_deleted = false",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Self::row_to_product(row)
    }

    /// Create a new product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_sku(&input.sku).map_err(|m| AppError::Validation {
            field: "sku".to_string(),
            message: m.to_string(),
        })?;
        validate_name(&input.name).map_err(|m| AppError::Validation {
            field: "name".to_string(),
            message: m.to_string(),
        })?;
        Self::validate_pricing_and_thresholds(
            input.price,
            input.cost,
            input.minimum_stock,
            input.maximum_stock,
        )?;

        let sku = input.sku.trim().to_uppercase();

        let sku_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1 AND is_deleted = false)",
        )
        .bind(&sku)
        .fetch_one(&self.db)
        .await?;

        if sku_exists {
            return Err(AppError::DuplicateEntry("sku".to_string()));
        }

        let category_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND is_deleted = false)",
        )
        .bind(input.category_id)
        .fetch_one(&self.db)
        .await?;

        if !category_exists {
            return Err(AppError::NotFound("Category".to_string()));
        }

        if let Some(supplier_id) = input.supplier_id {
            let supplier_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND is_deleted = false)",
            )
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;

            if !supplier_exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (sku, name, description, price, cost, minimum_stock,
                                  maximum_stock, status, category_id, supplier_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8, $9)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&sku)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.price)
        .bind(input.cost)
        .bind(input.minimum_stock)
        .bind(input.maximum_stock)
        .bind(input.category_id)
        .bind(input.supplier_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %row.id, sku = %row.sku, "Product created");

        Self::row_to_product(row)
    }

    /// Update a product
    ///
    /// The SKU is immutable after creation.
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        let existing = self.get_product(product_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::Validation {
                field: "name".to_string(),
                message: m.to_string(),
            })?;
        }

        let price = input.price.unwrap_or(existing.price);
        let cost = input.cost.unwrap_or(existing.cost);
        let minimum_stock = input.minimum_stock.unwrap_or(existing.minimum_stock);
        let maximum_stock = input.maximum_stock.unwrap_or(existing.maximum_stock);
        Self::validate_pricing_and_thresholds(price, cost, minimum_stock, maximum_stock)?;

        if let Some(category_id) = input.category_id {
            let category_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND is_deleted = false)",
            )
            .bind(category_id)
            .fetch_one(&self.db)
            .await?;

            if !category_exists {
                return Err(AppError::NotFound("Category".to_string()));
            }
        }

        if let Some(supplier_id) = input.supplier_id {
            let supplier_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND is_deleted = false)",
            )
            .bind(supplier_id)
            .fetch_one(&self.db)
            .await?;

            if !supplier_exists {
                return Err(AppError::NotFound("Supplier".to_string()));
            }
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let description = input.description.or(existing.description);
        let status = input.status.unwrap_or(existing.status);
        let category_id = input.category_id.unwrap_or(existing.category_id);
        let supplier_id = input.supplier_id.or(existing.supplier_id);

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET name = $1, description = $2, price = $3, cost = $4,
                minimum_stock = $5, maximum_stock = $6, status = $7,
                category_id = $8, supplier_id = $9, updated_at = NOW()
            WHERE id = $10
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&name)
        .bind(&description)
        .bind(price)
        .bind(cost)
        .bind(minimum_stock)
        .bind(maximum_stock)
        .bind(status.as_str())
        .bind(category_id)
        .bind(supplier_id)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        Self::row_to_product(row)
    }

    /// Soft-delete a product
    ///
    /// Movement history referencing the product is preserved.
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_deleted = true, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(product_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        tracing::info!(product_id = %product_id, "Product soft-deleted");

        Ok(())
    }

    /// Per-warehouse stock breakdown for a product
    ///
    /// Stock is derived from the movement ledger, never stored.
    pub async fn product_stock(&self, product_id: Uuid) -> AppResult<ProductStockBreakdown> {
        let product = self.get_product(product_id).await?;

        let lines = sqlx::query_as::<_, ProductStockLineRow>(
            r#"
            SELECT movement_type, warehouse_id, destination_warehouse_id, quantity
            FROM stock_movements
            WHERE product_id = $1 AND is_deleted = false
            ORDER BY created_at ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;

        let warehouses = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, name FROM warehouses WHERE is_deleted = false ORDER BY name ASC",
        )
        .fetch_all(&self.db)
        .await?;

        let mut stock_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let movement_type = MovementType::from_str(&line.movement_type).map_err(|_| {
                AppError::Internal(format!(
                    "Unknown movement type in ledger: {}",
                    line.movement_type
                ))
            })?;
            stock_lines.push(StockLine {
                movement_type,
                warehouse_id: line.warehouse_id,
                destination_warehouse_id: line.destination_warehouse_id,
                quantity: line.quantity,
            });
        }

        let mut per_warehouse: HashMap<Uuid, i64> = HashMap::new();
        for (warehouse_id, _) in &warehouses {
            let total: i64 = stock_lines
                .iter()
                .map(|line| signed_quantity(line, *warehouse_id))
                .sum();
            per_warehouse.insert(*warehouse_id, total);
        }

        let breakdown: Vec<WarehouseStock> = warehouses
            .into_iter()
            .filter_map(|(warehouse_id, warehouse_name)| {
                let quantity = per_warehouse.get(&warehouse_id).copied().unwrap_or(0);
                (quantity != 0).then_some(WarehouseStock {
                    warehouse_id,
                    warehouse_name,
                    quantity,
                })
            })
            .collect();

        Ok(Self::assemble_breakdown(product, breakdown))
    }

    fn assemble_breakdown(
        product: Product,
        warehouses: Vec<WarehouseStock>,
    ) -> ProductStockBreakdown {
        let total_stock: i64 = warehouses.iter().map(|w| w.quantity).sum();
        let is_low_stock = product.is_low_stock(total_stock);
        let is_over_stock = product.is_over_stock(total_stock);

        ProductStockBreakdown {
            product_id: product.id,
            sku: product.sku,
            name: product.name,
            total_stock,
            minimum_stock: product.minimum_stock,
            maximum_stock: product.maximum_stock,
            is_low_stock,
            is_over_stock,
            warehouses,
        }
    }

    fn validate_pricing_and_thresholds(
        price: Decimal,
        cost: Decimal,
        minimum_stock: i32,
        maximum_stock: i32,
    ) -> AppResult<()> {
        if price <= Decimal::ZERO {
            return Err(AppError::Validation {
                field: "price".to_string(),
                message: "Price must be greater than zero".to_string(),
            });
        }
        if cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "cost".to_string(),
                message: "Cost cannot be negative".to_string(),
            });
        }
        if minimum_stock < 0 {
            return Err(AppError::Validation {
                field: "minimum_stock".to_string(),
                message: "Minimum stock cannot be negative".to_string(),
            });
        }
        if maximum_stock < minimum_stock {
            return Err(AppError::Validation {
                field: "maximum_stock".to_string(),
                message: "Maximum stock cannot be below minimum stock".to_string(),
            });
        }
        Ok(())
    }

    fn row_to_product(row: ProductRow) -> AppResult<Product> {
        let status = ProductStatus::from_str(&row.status).map_err(|_| {
            AppError::Internal(format!("Unknown product status in database: {}", row.status))
        })?;

        Ok(Product {
            id: row.id,
            sku: row.sku,
            name: row.name,
            description: row.description,
            price: row.price,
            cost: row.cost,
            minimum_stock: row.minimum_stock,
            maximum_stock: row.maximum_stock,
            status,
            category_id: row.category_id,
            supplier_id: row.supplier_id,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
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
    fn zero_or_negative_price_is_rejected() {
        for price in [Decimal::ZERO, Decimal::from(-1)] {
            let result =
                ProductService::validate_pricing_and_thresholds(price, Decimal::ZERO, 0, 10);
            assert!(matches!(
                result,
                Err(AppError::Validation { ref field, .. }) if field == "price"
            ));
        }
    }

    #[test]
    fn zero_cost_is_allowed_but_negative_is_not() {
        assert!(ProductService::validate_pricing_and_thresholds(
            Decimal::ONE,
            Decimal::ZERO,
            0,
            10
        )
        .is_ok());

        let result = ProductService::validate_pricing_and_thresholds(
            Decimal::ONE,
            Decimal::from(-1),
            0,
            10,
        );
        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "cost"
        ));
    }

    #[test]
    fn maximum_below_minimum_is_rejected() {
        let result =
            ProductService::validate_pricing_and_thresholds(Decimal::ONE, Decimal::ZERO, 10, 5);
        assert!(matches!(
            result,
            Err(AppError::Validation { ref field, .. }) if field == "maximum_stock"
        ));
    }

    #[test]
    fn breakdown_totals_and_flags_come_from_the_ledger_sum() {
        let p = product(5, 100);
        let product_id = p.id;
        let warehouses = vec![
            WarehouseStock {
                warehouse_id: Uuid::new_v4(),
                warehouse_name: "Central".into(),
                quantity: 3,
            },
            WarehouseStock {
                warehouse_id: Uuid::new_v4(),
                warehouse_name: "North".into(),
                quantity: 1,
            },
        ];

        let breakdown = ProductService::assemble_breakdown(p, warehouses);

        assert_eq!(breakdown.product_id, product_id);
        assert_eq!(breakdown.sku, "WID-001");
        assert_eq!(breakdown.total_stock, 4);
        assert!(breakdown.is_low_stock);
        assert!(!breakdown.is_over_stock);
        assert_eq!(breakdown.warehouses.len(), 2);
    }
}
