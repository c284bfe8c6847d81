//! Channel peer listing and peer state handlers.

use super::OkAck;
use crate::access::{
    check_channel_access, check_channel_role, CHANNEL_READ_ROLES, CHANNEL_WRITE_ROLES,
};
use crate::errors::RelayError;
use crate::presence::{Peer, PeerState};
use crate::routes::AppState;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct ListPeersQuery {
    /// Narrow the listing to one peer instance.
    pub instance: Option<String>,
}

/// Handler for GET /api/v1/channels/{channel_type}/{channel_id}/peers.
#[instrument(skip_all, name = "relay.peers.list", fields(channel_type = %channel_type, channel_id = %channel_id))]
pub async fn list_channel_peers(
    State(state): State<Arc<AppState>>,
    Path((channel_type, channel_id)): Path<(String, String)>,
    Query(query): Query<ListPeersQuery>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Peer>>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    // Listings use the reader role set for every channel type, including
    // priv channels.
    check_channel_role(
        state.policy.as_ref(),
        &channel_type,
        &channel_id,
        CHANNEL_READ_ROLES,
        &ctx,
    )
    .await?;

    let peers = state
        .registry
        .list_peers(&channel_type, &channel_id, query.instance.as_deref())
        .await?;
    Ok(Json(peers))
}

/// Handler for GET /api/v1/peers/{peer}/state.
#[instrument(skip_all, name = "relay.peers.get_state", fields(peer = %peer_key))]
pub async fn get_peer_state(
    State(state): State<Arc<AppState>>,
    Path(peer_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<PeerState>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let peer = Peer::parse(&peer_key)?;
    check_channel_access(
        state.policy.as_ref(),
        &peer.channel_type,
        &peer.channel_id,
        CHANNEL_WRITE_ROLES,
        &ctx,
    )
    .await?;

    match state.registry.peer_state(&peer_key).await? {
        Some(peer_state) => Ok(Json(peer_state)),
        None => Err(RelayError::NotFound("peer state".to_string())),
    }
}

/// Handler for PUT /api/v1/peers/{peer}/state.
///
/// Only the peer's own session may change its state; the stored value is
/// fully replaced, never merged.
#[instrument(skip_all, name = "relay.peers.put_state", fields(peer = %peer_key))]
pub async fn put_peer_state(
    State(state): State<Arc<AppState>>,
    Path(peer_key): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(peer_state): Json<PeerState>,
) -> Result<Json<OkAck>, RelayError> {
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

    if peer_state.audio_state.is_empty() || peer_state.video_state.is_empty() {
        return Err(RelayError::Validation(
            "audioState and videoState must be non-empty".to_string(),
        ));
    }

    state.registry.set_peer_state(&peer_key, &peer_state).await?;
    Ok(Json(OkAck::new()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_peers_query_deserialization() {
        let query: ListPeersQuery = serde_json::from_str(r#"{"instance":"inst-1"}"#).unwrap();
        assert_eq!(query.instance.as_deref(), Some("inst-1"));

        let query: ListPeersQuery = serde_json::from_str("{}").unwrap();
        assert!(query.instance.is_none());
    }
}
