//! Product catalog HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::UserRole;

use crate::middleware::{require_role, CurrentUser};
use crate::services::product::{
    CreateProductInput, ProductListQuery, ProductService, UpdateProductInput,
};
use crate::AppState;

/// List products with optional search and filters
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> impl IntoResponse {
    let service = ProductService::new(state.db.clone());

    match service.list_products(query).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ProductService::new(state.db.clone());

    match service.get_product(product_id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Per-warehouse stock breakdown for a product
pub async fn get_product_stock(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = ProductService::new(state.db.clone());

    match service.product_stock(product_id).await {
        Ok(breakdown) => (StatusCode::OK, Json(breakdown)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new product
pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    let service = ProductService::new(state.db.clone());

    match service.create_product(input).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    let service = ProductService::new(state.db.clone());

    match service.update_product(product_id, input).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soft-delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = ProductService::new(state.db.clone());

    match service.delete_product(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
