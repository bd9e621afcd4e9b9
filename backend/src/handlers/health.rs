//! Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::AppState;

/// Health check endpoint reporting database connectivity
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let status = if db_healthy { "healthy" } else { "degraded" };
    let code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "database": db_healthy,
        })),
    )
}
