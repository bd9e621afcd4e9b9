//! Stock movement HTTP handlers
//!
//! Role map: purchases, transfers and adjustments need Admin or Supervisor;
//! sales are open to all authenticated roles; delete and restore are
//! Admin-only.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::UserRole;

use crate::middleware::{require_role, CurrentUser};
use crate::services::movement::{
    AdjustmentInput, MovementHistoryQuery, MovementService, PurchaseInput, SaleInput,
    TransferInput,
};
use crate::AppState;

fn movement_service(state: &AppState) -> MovementService {
    MovementService::new(state.db.clone(), state.stock_locks.clone())
}

/// Record a purchase
pub async fn process_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PurchaseInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    match movement_service(&state).process_purchase(user.user_id, input).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a sale
pub async fn process_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SaleInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(
        &user,
        &[UserRole::Admin, UserRole::Supervisor, UserRole::Operator],
    ) {
        return e.into_response();
    }

    match movement_service(&state).process_sale(user.user_id, input).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Transfer stock between warehouses
pub async fn transfer_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TransferInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    match movement_service(&state).transfer_stock(user.user_id, input).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Record a manual stock adjustment
pub async fn process_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AdjustmentInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    match movement_service(&state).process_adjustment(user.user_id, input).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Paginated movement history with filters
pub async fn movement_history(
    State(state): State<AppState>,
    Query(query): Query<MovementHistoryQuery>,
) -> impl IntoResponse {
    match movement_service(&state).movement_history(query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Derived stock with threshold flags for one (product, warehouse) pair
pub async fn stock_level(
    State(state): State<AppState>,
    Path((product_id, warehouse_id)): Path<(Uuid, Uuid)>,
) -> impl IntoResponse {
    match movement_service(&state).stock_level(product_id, warehouse_id).await {
        Ok(level) => (StatusCode::OK, Json(level)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soft-delete a movement so it stops contributing to stock projections
pub async fn delete_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    match movement_service(&state).soft_delete_movement(movement_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Restore a soft-deleted movement
pub async fn restore_movement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(movement_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    match movement_service(&state).restore_movement(movement_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
