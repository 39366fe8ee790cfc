//! The unauthenticated health check used by load balancers and uptime monitors.

use axum::Json;
use serde::Serialize;
use time::OffsetDateTime;

/// The body of a health check response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    success: bool,
    message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Report that the server is up.
pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus {
        success: true,
        message: "Server is healthy",
        timestamp: OffsetDateTime::now_utc(),
    })
}
