//! Supplier management service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::Supplier;
use shared::validation::{validate_email, validate_name};

use crate::error::{AppError, AppResult};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Input for creating a supplier
#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for updating a supplier
#[derive(Debug, Deserialize)]
pub struct UpdateSupplierInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: Uuid,
    name: String,
    tax_id: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    is_active: bool,
    is_deleted: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            tax_id: row.tax_id,
            email: row.email,
            phone: row.phone,
            address: row.address,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUPPLIER_COLUMNS: &str =
    "id, name, tax_id, email, phone, address, is_active, is_deleted, created_at, updated_at";

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all suppliers
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE is_deleted = false ORDER BY name ASC",
            SUPPLIER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(suppliers.into_iter().map(Supplier::from).collect())
    }

    /// Get a supplier by ID
    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE id = $1 AND is_deleted = false",
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(supplier.into())
    }

    /// Create a new supplier
    ///
    /// Tax IDs identify suppliers for invoicing and must be unique.
    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        validate_name(&input.name).map_err(|m| AppError::Validation {
            field: "name".to_string(),
            message: m.to_string(),
        })?;

        let tax_id = input.tax_id.trim();
        if tax_id.is_empty() {
            return Err(AppError::Validation {
                field: "tax_id".to_string(),
                message: "Tax ID cannot be empty".to_string(),
            });
        }

        if let Some(ref email) = input.email {
            validate_email(email).map_err(|m| AppError::Validation {
                field: "email".to_string(),
                message: m.to_string(),
            })?;
        }

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE tax_id = $1 AND is_deleted = false)",
        )
        .bind(tax_id)
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("tax_id".to_string()));
        }

        let supplier = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            INSERT INTO suppliers (name, tax_id, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(tax_id)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier.into())
    }

    /// Update a supplier
    ///
    /// The tax ID is immutable after creation.
    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        input: UpdateSupplierInput,
    ) -> AppResult<Supplier> {
        let existing = self.get_supplier(supplier_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::Validation {
                field: "name".to_string(),
                message: m.to_string(),
            })?;
        }
        if let Some(ref email) = input.email {
            validate_email(email).map_err(|m| AppError::Validation {
                field: "email".to_string(),
                message: m.to_string(),
            })?;
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let email = input.email.or(existing.email);
        let phone = input.phone.or(existing.phone);
        let address = input.address.or(existing.address);
        let is_active = input.is_active.unwrap_or(existing.is_active);

        let supplier = sqlx::query_as::<_, SupplierRow>(&format!(
            r#"
            UPDATE suppliers
            SET name = $1, email = $2, phone = $3, address = $4, is_active = $5,
                updated_at = NOW()
            WHERE id = $6
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(&name)
        .bind(&email)
        .bind(&phone)
        .bind(&address)
        .bind(is_active)
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        Ok(supplier.into())
    }

    /// Soft-delete a supplier
    pub async fn delete_supplier(&self, supplier_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE suppliers SET is_deleted = true, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(supplier_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }

        Ok(())
    }
}
