//! HTTP request handlers.

pub mod health;
pub mod messages;
pub mod metrics;
pub mod peers;
pub mod presence;
pub mod turn;

pub use health::{health_check, readiness_check};
pub use messages::{post_message, query_messages, stream_messages};
pub use metrics::metrics_handler;
pub use peers::{get_peer_state, list_channel_peers, put_peer_state};
pub use presence::{presence_all_offline, presence_offline, presence_online};
pub use turn::{get_turn_credentials, stream_turn_credentials};

use crate::access::{ClientContext, PublicSessionInfo, SessionResolver};
use crate::clients::SESSION_TOKEN_HEADER;
use crate::errors::RelayError;
use axum::http::HeaderMap;
use serde::Serialize;
use std::net::SocketAddr;
use tracing::warn;

/// Acknowledgement body returned by commands. Deliberately carries no
/// outcome detail: accepted and dropped posts look identical to the
/// caller.
#[derive(Debug, Serialize)]
pub struct OkAck {
    pub ok: bool,
}

impl OkAck {
    #[must_use]
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkAck {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the caller context from the session-token header and the
/// observed remote address.
pub(crate) fn client_context(
    headers: &HeaderMap,
    remote_addr: Option<SocketAddr>,
) -> Result<ClientContext, RelayError> {
    let session_token = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            RelayError::Validation(format!("missing {SESSION_TOKEN_HEADER} header"))
        })?
        .to_string();

    Ok(ClientContext {
        session_token,
        remote_addr: remote_addr.map(|addr| addr.to_string()),
    })
}

/// Resolve the caller's session and require it to match the session
/// segment a peer key claims.
pub(crate) async fn resolve_matching_session(
    resolver: &dyn SessionResolver,
    ctx: &ClientContext,
    claimed_session_id: &str,
) -> Result<PublicSessionInfo, RelayError> {
    let public = resolver.resolve_public_session(&ctx.session_token).await?;
    if public.id != claimed_session_id {
        warn!(
            target: "relay.handlers",
            "Request claimed a session that is not the caller's"
        );
        return Err(RelayError::IdentityMismatch);
    }
    Ok(public)
}
