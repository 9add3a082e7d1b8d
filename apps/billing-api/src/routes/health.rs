use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub database: bool,
}

/// Liveness plus a database ping.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<Health>>) {
    let database = state.db.health_check().await;

    if database {
        (
            StatusCode::OK,
            Json(ApiResponse::ok(Health { database }, "ok")),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: Some(Health { database }),
                message: "Database unavailable".to_string(),
                code: "UNAVAILABLE".to_string(),
            }),
        )
    }
}
