//! Health check and metrics endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::{AppError, AppState, WebResult};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

/// Readiness response body.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Always `"ready"`; failures are reported as an error body.
    pub status: &'static str,
}

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check the database.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check: one round trip to the ticket store.
///
/// # Status Codes
///
/// - 200 OK: the store answered
/// - 503 Service Unavailable: the store did not
///
/// # Endpoint
///
/// ```text
/// GET /health/ready
/// ```
///
/// # Errors
///
/// Returns `SERVICE_UNAVAILABLE` if the store ping fails.
pub async fn readiness_check(State(state): State<AppState>) -> WebResult<Json<ReadyResponse>> {
    state.tickets.ping().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        AppError::unavailable("Ticket store is unreachable")
    })?;
    Ok(Json(ReadyResponse { status: "ready" }))
}

/// Prometheus text exposition.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// Returns 404 when the server was started without a metrics recorder.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> WebResult<String> {
    state
        .metrics
        .as_ref()
        .map(metrics_exporter_prometheus::PrometheusHandle::render)
        .ok_or_else(|| AppError::not_found("Metrics are not enabled"))
}
