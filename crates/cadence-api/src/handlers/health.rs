use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::constants::{HEALTH_CHECK_TIMEOUT_SECS, SERVICE_VERSION};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    /// "healthy" or "degraded"
    pub status: String,
    /// "healthy", "timeout", "unavailable" or "not_configured"
    pub database: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthCheckResponse> {
    let database = match &state.pool {
        None => "not_configured".to_string(),
        Some(pool) => {
            let probe = sqlx::query("SELECT 1").execute(pool);
            match tokio::time::timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS), probe).await {
                Ok(Ok(_)) => "healthy".to_string(),
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Database health check failed");
                    "unavailable".to_string()
                }
                Err(_) => {
                    tracing::error!("Database health check timed out");
                    "timeout".to_string()
                }
            }
        }
    };

    let status = if database == "healthy" || database == "not_configured" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthCheckResponse {
        status: status.to_string(),
        database,
        version: SERVICE_VERSION.to_string(),
    })
}
