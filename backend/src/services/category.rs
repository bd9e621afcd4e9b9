//! Product category service

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::Category;
use shared::validation::validate_name;

use crate::error::{AppError, AppResult};

/// Category service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Input for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
}

/// Input for updating a category
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

const CATEGORY_COLUMNS: &str = "id, name, description, is_deleted, created_at, updated_at";

impl CategoryService {
    /// Create a new CategoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {} FROM categories WHERE is_deleted = false ORDER BY name ASC",
            CATEGORY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(categories.into_iter().map(Category::from).collect())
    }

    /// Get a category by ID
    pub async fn get_category(&self, category_id: Uuid) -> AppResult<Category> {
        let category = sqlx::query_as::<_, CategoryRow>(&format!(
            "SELECT {} FROM categories WHERE id = $1 AND is_deleted = false",
            CATEGORY_COLUMNS
        ))
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(category.into())
    }

    /// Create a new category
    pub async fn create_category(&self, input: CreateCategoryInput) -> AppResult<Category> {
        validate_name(&input.name).map_err(|m| AppError::Validation {
            field: "name".to_string(),
            message: m.to_string(),
        })?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories \
             WHERE LOWER(name) = LOWER($1) AND is_deleted = false)",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateEntry("name".to_string()));
        }

        let category = sqlx::query_as::<_, CategoryRow>(&format!(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        Ok(category.into())
    }

    /// Update a category
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> AppResult<Category> {
        let existing = self.get_category(category_id).await?;

        if let Some(ref name) = input.name {
            validate_name(name).map_err(|m| AppError::Validation {
                field: "name".to_string(),
                message: m.to_string(),
            })?;

            let duplicate = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories \
                 WHERE LOWER(name) = LOWER($1) AND is_deleted = false AND id != $2)",
            )
            .bind(name.trim())
            .bind(category_id)
            .fetch_one(&self.db)
            .await?;

            if duplicate {
                return Err(AppError::DuplicateEntry("name".to_string()));
            }
        }

        let name = input.name.map(|n| n.trim().to_string()).unwrap_or(existing.name);
        let description = input.description.or(existing.description);

        let category = sqlx::query_as::<_, CategoryRow>(&format!(
            "UPDATE categories SET name = $1, description = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(&name)
        .bind(&description)
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        Ok(category.into())
    }

    /// Soft-delete a category
    ///
    /// Rejected while any non-deleted product still references it.
    pub async fn delete_category(&self, category_id: Uuid) -> AppResult<()> {
        let product_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE category_id = $1 AND is_deleted = false",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if product_count > 0 {
            return Err(AppError::Conflict {
                resource: "category".to_string(),
                message: format!("{} products still reference this category", product_count),
            });
        }

        let result = sqlx::query(
            "UPDATE categories SET is_deleted = true, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(category_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_deleted: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            description: row.description,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
