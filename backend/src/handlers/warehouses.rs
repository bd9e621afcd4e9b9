//! Warehouse HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::UserRole;

use crate::middleware::{require_role, CurrentUser};
use crate::services::movement::MovementService;
use crate::services::warehouse::{CreateWarehouseInput, UpdateWarehouseInput, WarehouseService};
use crate::AppState;

/// List all warehouses
pub async fn list_warehouses(State(state): State<AppState>) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.list_warehouses().await {
        Ok(warehouses) => {
            (StatusCode::OK, Json(serde_json::json!({ "warehouses": warehouses })))
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Get a warehouse by ID
pub async fn get_warehouse(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = WarehouseService::new(state.db.clone());

    match service.get_warehouse(warehouse_id).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Per-product stock summaries for a warehouse
pub async fn get_warehouse_stock(
    State(state): State<AppState>,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = MovementService::new(state.db.clone(), state.stock_locks.clone());

    match service.stock_by_warehouse(warehouse_id).await {
        Ok(summaries) => {
            (StatusCode::OK, Json(serde_json::json!({ "stock": summaries }))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Create a new warehouse
pub async fn create_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateWarehouseInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = WarehouseService::new(state.db.clone());

    match service.create_warehouse(input).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a warehouse
pub async fn update_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
    Json(input): Json<UpdateWarehouseInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = WarehouseService::new(state.db.clone());

    match service.update_warehouse(warehouse_id, input).await {
        Ok(warehouse) => (StatusCode::OK, Json(warehouse)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soft-delete a warehouse
pub async fn delete_warehouse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(warehouse_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = WarehouseService::new(state.db.clone());

    match service.delete_warehouse(warehouse_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
