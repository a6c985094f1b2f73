//! Liveness and readiness endpoints used by orchestration and tests.

use crate::error::ApiError;
use crate::models::ApiResponse;
use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_db_pools::sqlx::{self, PgPool};
use serde::{Deserialize, Serialize};

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Database reachability, present on readiness checks only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Process is up; no dependencies are checked.
#[get("/health/live")]
pub fn live_health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "ok".to_string(),
        database: None,
    }))
}

/// Process is up and the catalog database answers queries.
#[get("/health/ready")]
pub async fn ready_health(
    pool: &State<PgPool>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    sqlx::query("SELECT 1").execute(pool.inner()).await?;

    Ok(Json(ApiResponse::new(HealthResponse {
        status: "ok".to_string(),
        database: Some("ok".to_string()),
    })))
}
