//! Metrics definitions for the relay service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `relay_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: standard HTTP methods
//! - `endpoint`: parameterized paths, unknowns collapsed to `/other`
//! - `outcome` / `event` / `mode`: small fixed vocabularies

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used to serve
/// `/metrics`. Must be called once, before any metric is recorded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g. already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("relay_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record HTTP request completion.
///
/// Metric: `relay_http_requests_total`, `relay_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);

    histogram!("relay_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone()
    )
    .record(duration.as_secs_f64());

    counter!("relay_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a message post outcome.
///
/// Metric: `relay_messages_posted_total`
/// Labels: `outcome` ("accepted" or "dropped")
pub fn record_message_post(outcome: &str) {
    counter!("relay_messages_posted_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record an applied presence event.
///
/// Metric: `relay_presence_events_total`
/// Labels: `event` ("online", "offline", "all_offline")
pub fn record_presence_event(event: &str) {
    counter!("relay_presence_events_total",
        "event" => event.to_string()
    )
    .increment(1);
}

/// Record a TURN credential issuance.
///
/// Metric: `relay_turn_credentials_issued_total`
/// Labels: `mode` ("oneshot" or "subscription"), `status`
pub fn record_turn_issuance(mode: &str, status: &str) {
    counter!("relay_turn_credentials_issued_total",
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Replaces peer keys and channel coordinates with placeholders.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/ready" | "/metrics" | "/api/v1/messages" | "/api/v1/messages/stream" => {
            path.to_string()
        }
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').collect();

    if path.starts_with("/api/v1/channels/") && parts.len() == 7 {
        if let Some(&"peers") = parts.get(6) {
            return "/api/v1/channels/{type}/{id}/peers".to_string();
        }
    }

    if path.starts_with("/api/v1/peers/") {
        match (parts.len(), parts.get(5), parts.get(6)) {
            (6, Some(&"state"), _) => return "/api/v1/peers/{peer}/state".to_string(),
            (6, Some(&"turn"), _) => return "/api/v1/peers/{peer}/turn".to_string(),
            (7, Some(&"turn"), Some(&"stream")) => {
                return "/api/v1/peers/{peer}/turn/stream".to_string()
            }
            _ => {}
        }
    }

    if path.starts_with("/internal/v1/presence/") && parts.len() == 5 {
        if let Some(action) = parts.get(4) {
            if matches!(*action, "online" | "offline" | "all-offline") {
                return format!("/internal/v1/presence/{action}");
            }
        }
    }

    "/other".to_string()
}
