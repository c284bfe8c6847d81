//! Relay service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Messages returned to clients are intentionally generic; the actual
//! failure detail is logged server-side.
//!
//! Note that a rate-limited message drop is *not* an error: the sequencer
//! reports it as [`crate::messages::PostOutcome::Dropped`] and the caller
//! receives a normal acknowledgement (documented lossy behavior).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Relay service error type.
///
/// Maps to HTTP status codes:
/// - `Validation`: 400 Bad Request
/// - `AccessDenied`: 403 Forbidden
/// - `NotFound`: 404 Not Found
/// - `IdentityMismatch`: 409 Conflict
/// - `Store`, `Config`, `Internal`: 500 Internal Server Error
/// - `Upstream`: 502 Bad Gateway
#[derive(Debug, Error)]
pub enum RelayError {
    /// A presence signal's claimed session does not match the canonically
    /// resolved session. The signal is dropped and never retried.
    #[error("public session id mismatch")]
    IdentityMismatch,

    /// Invalid or incomplete configuration (fatal at startup).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed request shape; no state was mutated.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Access policy rejected the request. No reason is leaked.
    #[error("Access denied")]
    AccessDenied,

    /// Resource not found (e.g. invalid/expired session token).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Durable store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A collaborator service call failed (session resolver, access policy).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal error.
    #[error("Internal error")]
    Internal,
}

impl RelayError {
    /// Returns the HTTP status code for this error (also used by metrics).
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::AccessDenied => 403,
            RelayError::NotFound(_) => 404,
            RelayError::IdentityMismatch => 409,
            RelayError::Config(_) | RelayError::Store(_) | RelayError::Internal => 500,
            RelayError::Upstream(_) => 502,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RelayError::IdentityMismatch => {
                // Stale or forged client-supplied peer key; log and reject.
                tracing::warn!(target: "relay.presence", "Presence signal identity mismatch");
                (
                    StatusCode::CONFLICT,
                    "IDENTITY_MISMATCH",
                    "Session does not match peer key".to_string(),
                )
            }
            RelayError::Validation(reason) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", reason.clone())
            }
            RelayError::AccessDenied => (
                StatusCode::FORBIDDEN,
                "ACCESS_DENIED",
                "Access denied".to_string(),
            ),
            RelayError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            RelayError::Store(err) => {
                tracing::error!(target: "relay.store", error = %err, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            RelayError::Upstream(err) => {
                tracing::error!(target: "relay.upstream", error = %err, "Collaborator call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_ERROR",
                    "An upstream service is unavailable".to_string(),
                )
            }
            RelayError::Config(err) => {
                tracing::error!(target: "relay.config", error = %err, "Configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            RelayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(RelayError::Validation("missing to".into()).status_code(), 400);
        assert_eq!(RelayError::AccessDenied.status_code(), 403);
        assert_eq!(RelayError::NotFound("session".into()).status_code(), 404);
        assert_eq!(RelayError::IdentityMismatch.status_code(), 409);
        assert_eq!(RelayError::Store("io".into()).status_code(), 500);
        assert_eq!(RelayError::Config("no secret".into()).status_code(), 500);
        assert_eq!(RelayError::Internal.status_code(), 500);
        assert_eq!(RelayError::Upstream("timeout".into()).status_code(), 502);
    }

    #[test]
    fn test_access_denied_leaks_nothing() {
        // The Display and client body carry no policy detail.
        assert_eq!(format!("{}", RelayError::AccessDenied), "Access denied");
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", RelayError::Validation("peer is required".into())),
            "Validation error: peer is required"
        );
        assert_eq!(
            format!("{}", RelayError::IdentityMismatch),
            "public session id mismatch"
        );
    }
}
