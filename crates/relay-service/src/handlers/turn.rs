//! TURN credential handlers: one-shot issuance and self-renewing SSE
//! subscription.

use crate::access::{check_channel_access, CHANNEL_WRITE_ROLES};
use crate::errors::RelayError;
use crate::observability::metrics::record_turn_issuance;
use crate::presence::Peer;
use crate::routes::AppState;
use crate::turn::{TurnCredentials, TurnSubscription};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

/// Handler for GET /api/v1/peers/{peer}/turn.
#[instrument(skip_all, name = "relay.turn.issue", fields(peer = %peer_key))]
pub async fn get_turn_credentials(
    State(state): State<Arc<AppState>>,
    Path(peer_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<TurnCredentials>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let peer = Peer::parse(&peer_key)?;
    super::resolve_matching_session(state.resolver.as_ref(), &ctx, &peer.session_id).await?;
    check_channel_access(
        state.policy.as_ref(),
        &peer.channel_type,
        &peer.channel_id,
        CHANNEL_WRITE_ROLES,
        &ctx,
    )
    .await?;

    let credentials = state.issuer.issue(ctx.remote_addr.clone())?;
    record_turn_issuance("oneshot", "success");
    Ok(Json(credentials))
}

/// Handler for GET /api/v1/peers/{peer}/turn/stream.
///
/// Pushes a credential immediately, then a fresh one at the midpoint of
/// each validity window. Disconnecting cancels the refresh loop.
#[instrument(skip_all, name = "relay.turn.stream", fields(peer = %peer_key))]
pub async fn stream_turn_credentials(
    State(state): State<Arc<AppState>>,
    Path(peer_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let peer = Peer::parse(&peer_key)?;
    super::resolve_matching_session(state.resolver.as_ref(), &ctx, &peer.session_id).await?;
    check_channel_access(
        state.policy.as_ref(),
        &peer.channel_type,
        &peer.channel_id,
        CHANNEL_WRITE_ROLES,
        &ctx,
    )
    .await?;

    let subscription = TurnSubscription::spawn(Arc::clone(&state.issuer), ctx.remote_addr.clone());
    let stream = subscription.map(|item| match item {
        Ok(credentials) => {
            record_turn_issuance("subscription", "success");
            Event::default().json_data(&credentials)
        }
        Err(_) => {
            record_turn_issuance("subscription", "error");
            // Generic body; the failure is already logged by the loop.
            Ok(Event::default()
                .event("error")
                .data("credential issuance failed"))
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
