//! User administration HTTP handlers, all Admin-only

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use shared::models::UserRole;

use crate::middleware::{require_role, CurrentUser};
use crate::services::auth::{AuthService, UpdateRoleInput};
use crate::AppState;

/// List all user accounts
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = AuthService::new(state.db.clone(), &state.config);

    match service.list_users().await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Change a user's role
pub async fn update_user_role(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateRoleInput>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = AuthService::new(state.db.clone(), &state.config);

    match service.update_user_role(user_id, input.role).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Toggle a user account between active and disabled
pub async fn toggle_user_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    if let Err(e) = require_role(&user, &[UserRole::Admin]) {
        return e.into_response();
    }

    let service = AuthService::new(state.db.clone(), &state.config);

    match service.toggle_user_status(user_id).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => e.into_response(),
    }
}
