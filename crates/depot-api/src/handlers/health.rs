//! Health check.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::HealthState;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub storage: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "A dependency is unavailable", body = HealthResponse)
    )
)]
pub async fn health_check(State(health): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = match &health.pool {
        None => "in-memory".to_string(),
        Some(pool) => {
            match tokio::time::timeout(CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await
            {
                Ok(Ok(_)) => "healthy".to_string(),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Database health check failed");
                    format!("unhealthy: {}", e)
                }
                Err(_) => {
                    tracing::error!("Database health check timed out");
                    "timeout".to_string()
                }
            }
        }
    };

    let healthy = database == "healthy" || database == "in-memory";
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "degraded" }.to_string(),
            database,
            storage: health.storage.backend_type().to_string(),
        }),
    )
}
