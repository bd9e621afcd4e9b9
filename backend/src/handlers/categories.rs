//! Category HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::UserRole;

use crate::middleware::{require_role, CurrentUser};
use crate::services::category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
use crate::AppState;

/// List all categories
pub async fn list_categories(State(state): State<AppState>) -> impl IntoResponse {
    let service = CategoryService::new(state.db.clone());

    match service.list_categories().await {
        Ok(categories) => {
            (StatusCode::OK, Json(serde_json::json!({ "categories": categories })))
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Get a category by ID
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> impl IntoResponse {
    let service = CategoryService::new(state.db.clone());

    match service.get_category(category_id).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Create a new category
pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateCategoryInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    let service = CategoryService::new(state.db.clone());

    match service.create_category(input).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update a category
pub async fn update_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin, UserRole::Supervisor]) {
        return e.into_response();
    }

    let service = CategoryService::new(state.db.clone());

    match service.update_category(category_id, input).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Soft-delete a category
pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(category_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = CategoryService::new(state.db.clone());

    match service.delete_category(category_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
