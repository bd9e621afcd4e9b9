//! Authentication HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::middleware::CurrentUser;
use crate::services::auth::{AuthService, LoginInput, RefreshInput, RegisterInput};
use crate::AppState;

/// Register a new user account
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> impl IntoResponse {
    let service = AuthService::new(state.db.clone(), &state.config);

    match service.register(input).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Log in with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> impl IntoResponse {
    let service = AuthService::new(state.db.clone(), &state.config);

    match service.login(input).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Exchange a refresh token for a new token pair
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> impl IntoResponse {
    let service = AuthService::new(state.db.clone(), &state.config);

    match service.refresh_token(&input.refresh_token).await {
        Ok(tokens) => (StatusCode::OK, Json(tokens)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Return the account behind the current token
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> impl IntoResponse {
    let service = AuthService::new(state.db.clone(), &state.config);

    match service.get_user(user.user_id).await {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(e) => e.into_response(),
    }
}
