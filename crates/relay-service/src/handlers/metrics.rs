//! Prometheus metrics endpoint handler.
//!
//! Unauthenticated so Prometheus can scrape it; only operational data
//! with bounded-cardinality labels is exposed.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics. Operational endpoint, not versioned under
/// /api/v1.
#[tracing::instrument(skip_all, name = "relay.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

#[cfg(test)]
mod tests {
    // A PrometheusHandle can only be installed once per process, so the
    // endpoint is exercised by the integration tests instead.
}
