//! Health check handlers.
//!
//! - `/health`: liveness probe, no dependency checks.
//! - `/ready`: readiness probe, verifies the access-control dependency is
//!   configured. Returns 200 when ready, 503 otherwise.

use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Readiness probe response body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_control: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe handler. Failure means the process is hung, so it
/// checks nothing beyond being able to answer.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Error messages are intentionally generic; actual failures are logged
/// server-side.
#[tracing::instrument(skip_all, name = "relay.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.config.access_control_url.is_empty() {
        tracing::warn!("Readiness check failed: access-control URL not configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                access_control: Some("unavailable"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            access_control: Some("configured"),
            error: None,
        }),
    )
}
