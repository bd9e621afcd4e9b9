//! Warehouse management service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::Warehouse;
use shared::validation::validate_name;

use crate::error::{AppError, AppResult};

/// Warehouse service
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Input for creating a warehouse
#[derive(Debug, Deserialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub address: String,
    pub max_capacity: Option<i32>,
}

/// Input for updating a warehouse
#[derive(Debug, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub max_capacity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    address: String,
    max_capacity: Option<i32>,
    is_active: bool,
    is_deleted: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: row.id,
            name: row.name,
            address: row.address,
            max_capacity: row.max_capacity,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const WAREHOUSE_COLUMNS: &str =
    "id, name, address, max_capacity, is_active, is_deleted, created_at, updated_at";

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all warehouses
    pub async fn list_warehouses(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouses WHERE is_deleted = false ORDER BY name ASC",
            WAREHOUSE_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses.into_iter().map(Warehouse::from).collect())
    }

    /// Get a warehouse by ID
    pub async fn get_warehouse(&self, warehouse_id: Uuid) -> AppResult<Warehouse> {
        let warehouse = sqlx::query_as::<_, WarehouseRow>(&format!(
            "SELECT {} FROM warehouses WHERE id = $1 AND is_deleted = false",
            WAREHOUSE_COLUMNS
        ))
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;

        Ok(warehouse.into())
    }

    /// Create a new warehouse
    pub async fn create_warehouse(&self, input: CreateWarehouseInput) -> AppResult<Warehouse> {
        validate_name(&input.name).map_err(|m| AppError::Validation {
            field: "name".to_string(),
            message: m.to_string(),
        })?;

        if input.address.trim().is_empty() {
            return Err(AppError::Validation {
                field: "address".to_string(),
                message: "Address cannot be empty".to_string(),
            });
        }

        if let Some(capacity) = input.max_capacity {
            if capacity <= 0 {
                return Err(AppError::Validation {
                    field: "max_capacity".to_string(),
                    message: "Maximum capacity must be positive".to_string(),
                });
            }
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses \
             WHERE LOWER(name) = LOWER($1) AND is_deleted = false)",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let warehouse = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            INSERT INTO warehouses (name, address, max_capacity)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(input.address.trim())
        .bind(input.max_capacity)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(warehouse_id = %warehouse.id, "Warehouse created");

        Ok(warehouse.into())
    }

    /// Update a warehouse
    ///
    /// Deactivating a warehouse stops new movements against it; existing
    /// ledger rows keep contributing to stock projections.
    pub async fn update_warehouse(
        &self,
        warehouse_id: Uuid,
        input: UpdateWarehouseInput,
    ) -> AppResult<Warehouse> {
        let existing = self.get_warehouse(warehouse_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::Validation {
                field: "name".to_string(),
                message: m.to_string(),
            })?;

            let duplicate = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM warehouses \
                 WHERE LOWER(name) = LOWER($1) AND is_deleted = false AND id != $2)",
            )
            .bind(name.trim())
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;

            if duplicate {
                return Err(AppError::DuplicateEntry("name".to_string()));
            }
        }

        if let Some(capacity) = input.max_capacity {
            if capacity <= 0 {
                return Err(AppError::Validation {
                    field: "max_capacity".to_string(),
                    message: "Maximum capacity must be positive".to_string(),
                });
            }
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let address = input
            .address
            .map(|a| a.trim().to_string())
            .unwrap_or(existing.address);
        let max_capacity = input.max_capacity.or(existing.max_capacity);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let warehouse = sqlx::query_as::<_, WarehouseRow>(&format!(
            r#"
            UPDATE warehouses
            SET name = $1, address = $2, max_capacity = $3, is_active = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING {}
            "#,
            WAREHOUSE_COLUMNS
        ))
        .bind(&name)
        .bind(&address)
        .bind(max_capacity)
        .bind(is_active)
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse.into())
    }

    /// Soft-delete a warehouse
    ///
    /// Rejected while the warehouse still holds stock for any product.
    pub async fn delete_warehouse(&self, warehouse_id: Uuid) -> AppResult<()> {
        let held = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT SUM(
                CASE
                    WHEN movement_type = 'entry' AND warehouse_id = $1 THEN quantity
                    WHEN movement_type = 'transfer' AND destination_warehouse_id = $1 THEN quantity
                    WHEN warehouse_id = $1 THEN -quantity
                    ELSE 0
                END
            )
            FROM stock_movements
            WHERE is_deleted = false
              AND (warehouse_id = $1 OR destination_warehouse_id = $1)
            "#,
        )
        .bind(warehouse_id)
        .fetch_one(&self.db)
        .await?
        .unwrap_or(0);

        if held != 0 {
            return Err(AppError::Conflict {
                resource: "warehouse".to_string(),
                message: format!("Warehouse still holds stock ({} units across products)", held),
            });
        }

        let result = sqlx::query(
            "UPDATE warehouses SET is_deleted = true, is_active = false, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(warehouse_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        Ok(())
    }
}
