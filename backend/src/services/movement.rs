//! Stock movement service
//!
//! The transactional core of the system: purchase, sale, transfer and
//! adjustment processors over the append-only movement ledger, plus the
//! derived-stock queries. Stock is never stored; every figure is produced by
//! replaying the ledger with `shared::models::project_stock`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use shared::models::{project_stock, MovementType, NewMovement, StockDirection, StockLine};
use shared::types::{PaginatedResponse, Pagination};

use crate::error::{AppError, AppResult};

/// Per-(product, warehouse) async locks serializing check-then-write
///
/// A sale or transfer projects current stock, checks sufficiency, then
/// inserts — two concurrent decrements of the same key could both read the
/// same pre-decrement projection and oversell. The lock is held from before
/// the projection until after commit. The server runs as a single process in
/// front of its pool; a multi-process deployment would move this to
/// `pg_advisory_xact_lock` on the same key.
///
/// Entries are never evicted. The registry is bounded by the number of
/// distinct (product, warehouse) pairs actually traded, each entry a single
/// `Arc<Mutex<()>>`, so it stays small relative to the ledger itself.
#[derive(Clone, Default)]
pub struct StockLocks {
    locks: Arc<Mutex<HashMap<(Uuid, Uuid), Arc<tokio::sync::Mutex<()>>>>>,
}

impl StockLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a (product, warehouse) key
    pub async fn acquire(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().expect("stock lock registry poisoned");
            map.entry((product_id, warehouse_id))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Stock movement service for ledger processing and derived-stock queries
#[derive(Clone)]
pub struct MovementService {
    db: PgPool,
    locks: StockLocks,
}

/// Input for processing a purchase (Entry movement)
#[derive(Debug, Deserialize)]
pub struct PurchaseInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: String,
    pub supplier_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Input for processing a sale (Exit movement)
#[derive(Debug, Deserialize)]
pub struct SaleInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: String,
    pub notes: Option<String>,
}

/// Input for transferring stock between warehouses
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub product_id: Uuid,
    pub source_warehouse_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: String,
    pub notes: Option<String>,
}

/// Input for a manual stock adjustment
///
/// The ledger signs a movement by its type alone, so the caller must state
/// the direction explicitly: `out` stores an Adjustment row, `in` stores an
/// Entry row. Notes are mandatory either way.
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub direction: StockDirection,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: String,
    pub notes: String,
}

/// A persisted movement enriched with product/warehouse names for display
#[derive(Debug, Clone, Serialize)]
pub struct MovementResponse {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub reference: String,
    pub notes: Option<String>,
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_warehouse_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_warehouse_name: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// Query parameters for the movement history
#[derive(Debug, Default, Deserialize)]
pub struct MovementHistoryQuery {
    pub product_id: Option<Uuid>,
    /// Matches movements where the warehouse is source or destination
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Soft-deleted movements are hidden unless explicitly requested
    #[serde(default)]
    pub include_deleted: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Derived stock for one (product, warehouse) pair
#[derive(Debug, Clone, Serialize)]
pub struct StockLevelResponse {
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub warehouse_id: Uuid,
    pub warehouse_name: String,
    pub current_stock: i64,
    pub is_low_stock: bool,
    pub is_over_stock: bool,
}

/// Per-product stock summary for a warehouse
#[derive(Debug, Clone, Serialize)]
pub struct ProductStockSummary {
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub current_stock: i64,
    pub average_cost: Decimal,
    pub total_value: Decimal,
}

/// Product fields the processors need
#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    status: String,
    minimum_stock: i32,
    maximum_stock: i32,
}

#[derive(Debug, FromRow)]
struct WarehouseRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

/// Raw movement row; movement_type is stored as text
#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    movement_type: String,
    product_id: Uuid,
    warehouse_id: Uuid,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
    unit_price: Decimal,
    reference: String,
    notes: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
}

/// Movement row joined with product/warehouse names
#[derive(Debug, FromRow)]
struct MovementDetailRow {
    id: Uuid,
    movement_type: String,
    product_id: Uuid,
    warehouse_id: Uuid,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
    unit_price: Decimal,
    reference: String,
    notes: Option<String>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    product_sku: String,
    product_name: String,
    warehouse_name: String,
    destination_warehouse_name: Option<String>,
}

/// Row for the stock projection fold
#[derive(Debug, FromRow)]
struct StockLineRow {
    movement_type: String,
    warehouse_id: Uuid,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
}

/// Row for warehouse stock summaries
#[derive(Debug, FromRow)]
struct WarehouseStockRow {
    movement_type: String,
    warehouse_id: Uuid,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
    unit_price: Decimal,
    product_id: Uuid,
    product_sku: String,
    product_name: String,
}

const MOVEMENT_COLUMNS: &str = "id, movement_type, product_id, warehouse_id, \
     destination_warehouse_id, quantity, unit_price, reference, notes, is_deleted, \
     created_at, created_by";

fn parse_movement_type(raw: &str) -> AppResult<MovementType> {
    raw.parse::<MovementType>()
        .map_err(|_| AppError::Internal(format!("Unknown movement type in ledger: {}", raw)))
}

impl StockLineRow {
    fn into_line(self) -> AppResult<StockLine> {
        Ok(StockLine {
            movement_type: parse_movement_type(&self.movement_type)?,
            warehouse_id: self.warehouse_id,
            destination_warehouse_id: self.destination_warehouse_id,
            quantity: self.quantity,
        })
    }
}

impl MovementService {
    /// Create a new MovementService instance
    pub fn new(db: PgPool, locks: StockLocks) -> Self {
        Self { db, locks }
    }

    // ========================================================================
    // Processors
    // ========================================================================

    /// Process a purchase: one Entry movement
    ///
    /// Purchases only add stock, so there is no sufficiency check and no
    /// lock; the single insert happens only after every precondition read
    /// has passed.
    pub async fn process_purchase(
        &self,
        user_id: Uuid,
        input: PurchaseInput,
    ) -> AppResult<MovementResponse> {
        let product = self.fetch_product(input.product_id).await?;
        let warehouse = self.fetch_active_warehouse(input.warehouse_id, "Warehouse").await?;

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

        let movement = NewMovement::entry(
            input.product_id,
            input.warehouse_id,
            input.quantity,
            input.unit_price,
            &input.reference,
            input.notes.as_deref(),
        )?;

        let row = insert_movement(&self.db, &movement, user_id).await?;

        tracing::info!(
            movement_id = %row.id,
            product_id = %product.id,
            warehouse_id = %warehouse.id,
            quantity = row.quantity,
            "Purchase processed"
        );

        to_response(row, &product, &warehouse, None)
    }

    /// Process a sale: one Exit movement, guarded by a sufficiency check
    ///
    /// The per-key stock lock is held across projection, check and commit so
    /// concurrent sales cannot both pass the check on the same stock.
    pub async fn process_sale(&self, user_id: Uuid, input: SaleInput) -> AppResult<MovementResponse> {
        let product = self.fetch_product(input.product_id).await?;
        if product.status != "active" {
            return Err(AppError::InactiveResource("Product".to_string()));
        }
        let warehouse = self.fetch_active_warehouse(input.warehouse_id, "Warehouse").await?;

        // Factory validation happens before any stock access
        let movement = NewMovement::exit(
            input.product_id,
            input.warehouse_id,
            input.quantity,
            input.unit_price,
            &input.reference,
            input.notes.as_deref(),
        )?;

        let _guard = self.locks.acquire(input.product_id, input.warehouse_id).await;

        let available = self.current_stock(input.product_id, input.warehouse_id).await?;
        if available < i64::from(input.quantity) {
            return Err(AppError::InsufficientStock {
                available,
                requested: input.quantity,
            });
        }

        let mut tx = self.db.begin().await?;
        let row = insert_movement(&mut *tx, &movement, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            movement_id = %row.id,
            product_id = %product.id,
            warehouse_id = %warehouse.id,
            quantity = row.quantity,
            available = available,
            "Sale processed"
        );

        to_response(row, &product, &warehouse, None)
    }

    /// Transfer stock between warehouses: one Transfer movement encoding the
    /// source debit and the destination credit
    pub async fn transfer_stock(
        &self,
        user_id: Uuid,
        input: TransferInput,
    ) -> AppResult<MovementResponse> {
        let product = self.fetch_product(input.product_id).await?;
        if product.status != "active" {
            return Err(AppError::InactiveResource("Product".to_string()));
        }
        let source = self
            .fetch_active_warehouse(input.source_warehouse_id, "Source warehouse")
            .await?;
        let destination = self
            .fetch_active_warehouse(input.destination_warehouse_id, "Destination warehouse")
            .await?;

        // Rejects source == destination before any stock access
        let movement = NewMovement::transfer(
            input.product_id,
            input.source_warehouse_id,
            input.destination_warehouse_id,
            input.quantity,
            input.unit_price,
            &input.reference,
            input.notes.as_deref(),
        )?;

        // Sufficiency only concerns the source side
        let _guard = self
            .locks
            .acquire(input.product_id, input.source_warehouse_id)
            .await;

        let available = self
            .current_stock(input.product_id, input.source_warehouse_id)
            .await?;
        if available < i64::from(input.quantity) {
            return Err(AppError::InsufficientStock {
                available,
                requested: input.quantity,
            });
        }

        let mut tx = self.db.begin().await?;
        let row = insert_movement(&mut *tx, &movement, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            movement_id = %row.id,
            product_id = %product.id,
            source = %source.id,
            destination = %destination.id,
            quantity = row.quantity,
            "Transfer processed"
        );

        to_response(row, &product, &source, Some(&destination))
    }

    /// Record a manual adjustment with an explicit direction
    ///
    /// No sufficiency check: adjustments reconcile the ledger to a physical
    /// count and may push a miscounted ledger downward. The product does not
    /// need to be active; corrections apply to retired products too.
    pub async fn process_adjustment(
        &self,
        user_id: Uuid,
        input: AdjustmentInput,
    ) -> AppResult<MovementResponse> {
        let product = self.fetch_product(input.product_id).await?;
        let warehouse = self.fetch_active_warehouse(input.warehouse_id, "Warehouse").await?;

        if input.notes.trim().is_empty() {
            return Err(AppError::Validation {
                field: "notes".to_string(),
                message: "Notes are required for adjustments".to_string(),
            });
        }

        let movement = match input.direction {
            StockDirection::Out => NewMovement::adjustment(
                input.product_id,
                input.warehouse_id,
                input.quantity,
                input.unit_price,
                &input.reference,
                &input.notes,
            )?,
            // The replay rule has no additive adjustment type; an inward
            // correction is recorded as an Entry
            StockDirection::In => NewMovement::entry(
                input.product_id,
                input.warehouse_id,
                input.quantity,
                input.unit_price,
                &input.reference,
                Some(&input.notes),
            )?,
        };

        let row = insert_movement(&self.db, &movement, user_id).await?;

        tracing::info!(
            movement_id = %row.id,
            product_id = %product.id,
            warehouse_id = %warehouse.id,
            direction = ?input.direction,
            quantity = row.quantity,
            "Adjustment recorded"
        );

        to_response(row, &product, &warehouse, None)
    }

    // ========================================================================
    // Soft delete
    // ========================================================================

    /// Flip a movement's soft-delete flag on; the only permitted mutation
    pub async fn soft_delete_movement(&self, movement_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE stock_movements SET is_deleted = true WHERE id = $1 AND is_deleted = false")
                .bind(movement_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Movement".to_string()));
        }

        Ok(())
    }

    /// Restore a soft-deleted movement
    pub async fn restore_movement(&self, movement_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE stock_movements SET is_deleted = false WHERE id = $1 AND is_deleted = true")
                .bind(movement_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Movement".to_string()));
        }

        Ok(())
    }

    // ========================================================================
    // Derived-stock queries
    // ========================================================================

    /// Current stock for a (product, warehouse) pair, by ledger replay
    pub async fn current_stock(&self, product_id: Uuid, warehouse_id: Uuid) -> AppResult<i64> {
        let rows = sqlx::query_as::<_, StockLineRow>(
            r#"
            SELECT movement_type, warehouse_id, destination_warehouse_id, quantity
            FROM stock_movements
            WHERE product_id = $1
              AND (warehouse_id = $2 OR destination_warehouse_id = $2)
              AND is_deleted = false
            ORDER BY created_at
            "#,
        )
        .bind(product_id)
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        let lines = rows
            .into_iter()
            .map(StockLineRow::into_line)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(project_stock(warehouse_id, &lines))
    }

    /// Current stock with threshold flags for one (product, warehouse) pair
    pub async fn stock_level(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> AppResult<StockLevelResponse> {
        let product = self.fetch_product(product_id).await?;
        let warehouse = self.fetch_warehouse(warehouse_id, "Warehouse").await?;

        let current_stock = self.current_stock(product_id, warehouse_id).await?;

        Ok(StockLevelResponse {
            product_id: product.id,
            product_sku: product.sku,
            product_name: product.name,
            warehouse_id: warehouse.id,
            warehouse_name: warehouse.name,
            current_stock,
            is_low_stock: current_stock <= i64::from(product.minimum_stock),
            is_over_stock: current_stock >= i64::from(product.maximum_stock),
        })
    }

    /// Per-product stock summaries for a warehouse (stock > 0 only)
    pub async fn stock_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> AppResult<Vec<ProductStockSummary>> {
        // Existence only; stock in an inactive warehouse is still reportable
        self.fetch_warehouse(warehouse_id, "Warehouse").await?;

        let rows = sqlx::query_as::<_, WarehouseStockRow>(
            r#"
            SELECT m.movement_type, m.warehouse_id, m.destination_warehouse_id,
                   m.quantity, m.unit_price, m.product_id, p.sku AS product_sku,
                   p.name AS product_name
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            WHERE (m.warehouse_id = $1 OR m.destination_warehouse_id = $1)
              AND m.is_deleted = false
            ORDER BY m.created_at
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        let mut by_product: HashMap<Uuid, (String, String, Vec<(StockLine, Decimal)>)> =
            HashMap::new();

        for row in rows {
            let line = StockLine {
                movement_type: parse_movement_type(&row.movement_type)?,
                warehouse_id: row.warehouse_id,
                destination_warehouse_id: row.destination_warehouse_id,
                quantity: row.quantity,
            };
            by_product
                .entry(row.product_id)
                .or_insert_with(|| (row.product_sku, row.product_name, Vec::new()))
                .2
                .push((line, row.unit_price));
        }

        let mut summaries: Vec<ProductStockSummary> = by_product
            .into_iter()
            .map(|(product_id, (sku, name, lines))| {
                let current_stock =
                    project_stock(warehouse_id, lines.iter().map(|(line, _)| line));
                let total_value: Decimal = lines
                    .iter()
                    .map(|(line, price)| {
                        Decimal::from(shared::models::signed_quantity(line, warehouse_id)) * *price
                    })
                    .sum();
                let average_cost = if lines.is_empty() {
                    Decimal::ZERO
                } else {
                    let sum: Decimal = lines.iter().map(|(_, price)| *price).sum();
                    sum / Decimal::from(lines.len() as i64)
                };
                ProductStockSummary {
                    product_id,
                    product_sku: sku,
                    product_name: name,
                    current_stock,
                    average_cost,
                    total_value,
                }
            })
            .filter(|s| s.current_stock > 0)
            .collect();

        summaries.sort_by(|a, b| a.product_name.cmp(&b.product_name));

        Ok(summaries)
    }

    /// Paginated movement history with optional filters
    pub async fn movement_history(
        &self,
        query: MovementHistoryQuery,
    ) -> AppResult<PaginatedResponse<MovementResponse>> {
        let movement_type = match query.movement_type.as_deref() {
            Some(raw) => Some(
                raw.parse::<MovementType>()
                    .map_err(|m| AppError::Validation {
                        field: "movement_type".to_string(),
                        message: m.to_string(),
                    })?,
            ),
            None => None,
        };
        let type_filter = movement_type.map(|t| t.as_str());

        let pagination = Pagination {
            page: query.page.unwrap_or(1),
            per_page: query.per_page.unwrap_or(20),
        }
        .normalized();

        const WHERE_CLAUSE: &str = r#"
            WHERE ($1::uuid IS NULL OR m.product_id = $1)
              AND ($2::uuid IS NULL OR m.warehouse_id = $2 OR m.destination_warehouse_id = $2)
              AND ($3::text IS NULL OR m.movement_type = $3)
              AND ($4::timestamptz IS NULL OR m.created_at >= $4)
              AND ($5::timestamptz IS NULL OR m.created_at <= $5)
              AND ($6::bool OR m.is_deleted = false)
        "#;

        let total_items = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_movements m {}",
            WHERE_CLAUSE
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(type_filter)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.include_deleted)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, MovementDetailRow>(&format!(
            r#"
            SELECT m.id, m.movement_type, m.product_id, m.warehouse_id,
                   m.destination_warehouse_id, m.quantity, m.unit_price, m.reference,
                   m.notes, m.is_deleted, m.created_at, m.created_by,
                   p.sku AS product_sku, p.name AS product_name,
                   w.name AS warehouse_name, dw.name AS destination_warehouse_name
            FROM stock_movements m
            JOIN products p ON p.id = m.product_id
            JOIN warehouses w ON w.id = m.warehouse_id
            LEFT JOIN warehouses dw ON dw.id = m.destination_warehouse_id
            {}
            ORDER BY m.created_at DESC
            LIMIT $7 OFFSET $8
            "#,
            WHERE_CLAUSE
        ))
        .bind(query.product_id)
        .bind(query.warehouse_id)
        .bind(type_filter)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(query.include_deleted)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let movements = rows
            .into_iter()
            .map(detail_to_response)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(PaginatedResponse::new(
            movements,
            &pagination,
            total_items as u64,
        ))
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    async fn fetch_product(&self, product_id: Uuid) -> AppResult<ProductRow> {
        sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, sku, name, status, minimum_stock, maximum_stock
            FROM products
            WHERE id = $1 AND is_deleted = false
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    async fn fetch_warehouse(&self, warehouse_id: Uuid, label: &str) -> AppResult<WarehouseRow> {
        sqlx::query_as::<_, WarehouseRow>(
            "SELECT id, name, is_active FROM warehouses WHERE id = $1 AND is_deleted = false",
        )
        .bind(warehouse_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(label.to_string()))
    }

    async fn fetch_active_warehouse(
        &self,
        warehouse_id: Uuid,
        label: &str,
    ) -> AppResult<WarehouseRow> {
        let warehouse = self.fetch_warehouse(warehouse_id, label).await?;
        if !warehouse.is_active {
            return Err(AppError::InactiveResource(label.to_string()));
        }
        Ok(warehouse)
    }
}

/// Append one movement to the ledger
async fn insert_movement<'e, E>(
    executor: E,
    movement: &NewMovement,
    created_by: Uuid,
) -> AppResult<MovementRow>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, MovementRow>(&format!(
        r#"
        INSERT INTO stock_movements (
            movement_type, product_id, warehouse_id, destination_warehouse_id,
            quantity, unit_price, reference, notes, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    ))
    .bind(movement.movement_type.as_str())
    .bind(movement.product_id)
    .bind(movement.warehouse_id)
    .bind(movement.destination_warehouse_id)
    .bind(movement.quantity)
    .bind(movement.unit_price)
    .bind(&movement.reference)
    .bind(&movement.notes)
    .bind(created_by)
    .fetch_one(executor)
    .await?;

    Ok(row)
}

fn to_response(
    row: MovementRow,
    product: &ProductRow,
    warehouse: &WarehouseRow,
    destination: Option<&WarehouseRow>,
) -> AppResult<MovementResponse> {
    let movement_type = parse_movement_type(&row.movement_type)?;

    Ok(MovementResponse {
        id: row.id,
        movement_type,
        quantity: row.quantity,
        unit_price: row.unit_price,
        total_amount: Decimal::from(row.quantity) * row.unit_price,
        reference: row.reference,
        notes: row.notes,
        product_id: row.product_id,
        product_sku: product.sku.clone(),
        product_name: product.name.clone(),
        warehouse_id: row.warehouse_id,
        warehouse_name: warehouse.name.clone(),
        destination_warehouse_id: row.destination_warehouse_id,
        destination_warehouse_name: destination.map(|w| w.name.clone()),
        is_deleted: row.is_deleted,
        created_at: row.created_at,
        created_by: row.created_by,
    })
}

fn detail_to_response(row: MovementDetailRow) -> AppResult<MovementResponse> {
    let movement_type = parse_movement_type(&row.movement_type)?;

    Ok(MovementResponse {
        id: row.id,
        movement_type,
        quantity: row.quantity,
        unit_price: row.unit_price,
        total_amount: Decimal::from(row.quantity) * row.unit_price,
        reference: row.reference,
        notes: row.notes,
        product_id: row.product_id,
        product_sku: row.product_sku,
        product_name: row.product_name,
        warehouse_id: row.warehouse_id,
        warehouse_name: row.warehouse_name,
        destination_warehouse_id: row.destination_warehouse_id,
        destination_warehouse_name: row.destination_warehouse_name,
        is_deleted: row.is_deleted,
        created_at: row.created_at,
        created_by: row.created_by,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MovementType;

    fn entry_line(warehouse: Uuid, quantity: i32) -> StockLine {
        StockLine {
            movement_type: MovementType::Entry,
            warehouse_id: warehouse,
            destination_warehouse_id: None,
            quantity,
        }
    }

    fn exit_line(warehouse: Uuid, quantity: i32) -> StockLine {
        StockLine {
            movement_type: MovementType::Exit,
            warehouse_id: warehouse,
            destination_warehouse_id: None,
            quantity,
        }
    }

    /// Check-then-write against a shared ledger, guarded the same way the
    /// sale processor is: lock, project, check, append.
    async fn try_sale(
        locks: &StockLocks,
        ledger: &Arc<tokio::sync::Mutex<Vec<StockLine>>>,
        product: Uuid,
        warehouse: Uuid,
        quantity: i32,
    ) -> Result<(), i64> {
        let _guard = locks.acquire(product, warehouse).await;

        let available = {
            let lines = ledger.lock().await;
            project_stock(warehouse, lines.iter())
        };

        // Widen the race window between check and write
        tokio::task::yield_now().await;

        if available < i64::from(quantity) {
            return Err(available);
        }

        ledger.lock().await.push(exit_line(warehouse, quantity));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_sales_against_same_stock_never_oversell() {
        let locks = StockLocks::new();
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();
        let ledger = Arc::new(tokio::sync::Mutex::new(vec![entry_line(warehouse, 10)]));

        let a = {
            let (locks, ledger) = (locks.clone(), ledger.clone());
            tokio::spawn(async move { try_sale(&locks, &ledger, product, warehouse, 10).await })
        };
        let b = {
            let (locks, ledger) = (locks.clone(), ledger.clone());
            tokio::spawn(async move { try_sale(&locks, &ledger, product, warehouse, 10).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let failures = results.iter().filter(|r| r.is_err()).count();

        assert_eq!(successes, 1);
        assert_eq!(failures, 1);

        // The loser observed zero stock after the winner's write
        let available = results.iter().find_map(|r| r.as_ref().err().copied());
        assert_eq!(available, Some(0));

        let lines = ledger.lock().await;
        assert_eq!(project_stock(warehouse, lines.iter()), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks = StockLocks::new();
        let product = Uuid::new_v4();
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();

        let _guard_a = locks.acquire(product, warehouse_a).await;
        // Would deadlock if keys shared a lock
        let _guard_b = locks.acquire(product, warehouse_b).await;
    }

    #[tokio::test]
    async fn same_key_serializes() {
        let locks = StockLocks::new();
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let guard = locks.acquire(product, warehouse).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(product, warehouse).await;
            })
        };

        // The contender cannot finish while the guard is held
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
