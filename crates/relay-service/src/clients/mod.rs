//! Access-control service HTTP client.
//!
//! Session resolution and channel authorization live in a separate
//! service; this client is the production implementation of the
//! [`SessionResolver`] and [`AccessPolicy`] seams. Upstream failures are
//! logged server-side and surface as generic `Upstream` errors.

use crate::access::{AccessPolicy, ClientContext, PublicSessionInfo, SessionResolver};
use crate::errors::RelayError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument, warn};

/// Header carrying the caller's opaque session token, forwarded verbatim.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

const REQUEST_TIMEOUT_SECS: u64 = 10;
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Serialize)]
struct RoleCheckRequest<'a> {
    category: &'a str,
    channel_id: &'a str,
    roles: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_addr: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PrivateCheckRequest<'a> {
    channel_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_addr: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    granted: bool,
}

/// HTTP client for the access-control service.
#[derive(Clone)]
pub struct AccessControlClient {
    client: Client,
    base_url: String,
}

impl AccessControlClient {
    /// # Errors
    ///
    /// Returns `RelayError::Internal` if the HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "relay.clients", error = %e, "Failed to build HTTP client");
                RelayError::Internal
            })?;

        Ok(Self { client, base_url })
    }

    async fn check(
        &self,
        path: &str,
        body: &impl Serialize,
        ctx: &ClientContext,
    ) -> Result<bool, RelayError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(SESSION_TOKEN_HEADER, &ctx.session_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "relay.clients", error = %e, "Access-control request failed");
                RelayError::Upstream("access-control service is unavailable".to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let check: CheckResponse = response.json().await.map_err(|e| {
                error!(target: "relay.clients", error = %e, "Failed to parse access-control response");
                RelayError::Upstream("invalid access-control response".to_string())
            })?;
            Ok(check.granted)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Ok(false)
        } else {
            warn!(target: "relay.clients", status = %status, "Unexpected access-control response");
            Err(RelayError::Upstream(
                "access-control service is unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl SessionResolver for AccessControlClient {
    #[instrument(skip_all)]
    async fn resolve_public_session(
        &self,
        session_token: &str,
    ) -> Result<PublicSessionInfo, RelayError> {
        let url = format!("{}/api/v1/session", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(SESSION_TOKEN_HEADER, session_token)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "relay.clients", error = %e, "Session resolution request failed");
                RelayError::Upstream("access-control service is unavailable".to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(|e| {
                error!(target: "relay.clients", error = %e, "Failed to parse session response");
                RelayError::Upstream("invalid access-control response".to_string())
            })
        } else if status == StatusCode::NOT_FOUND || status == StatusCode::UNAUTHORIZED {
            Err(RelayError::NotFound("session".to_string()))
        } else {
            warn!(target: "relay.clients", status = %status, "Unexpected session response");
            Err(RelayError::Upstream(
                "access-control service is unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl AccessPolicy for AccessControlClient {
    #[instrument(skip_all, fields(channel_id = %channel_id))]
    async fn has_channel_role(
        &self,
        category: &str,
        channel_id: &str,
        roles: &[&str],
        ctx: &ClientContext,
    ) -> Result<bool, RelayError> {
        let request = RoleCheckRequest {
            category,
            channel_id,
            roles,
            remote_addr: ctx.remote_addr.as_deref(),
        };
        self.check("/api/v1/access/channel-role", &request, ctx).await
    }

    #[instrument(skip_all, fields(channel_id = %channel_id))]
    async fn has_private_access(
        &self,
        channel_id: &str,
        ctx: &ClientContext,
    ) -> Result<bool, RelayError> {
        let request = PrivateCheckRequest {
            channel_id,
            remote_addr: ctx.remote_addr.as_deref(),
        };
        self.check("/api/v1/access/private", &request, ctx).await
    }
}
