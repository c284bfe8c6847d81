//! Internal presence signal endpoints.
//!
//! These are event inputs, not client APIs: no role checks apply, only
//! session reconciliation. A mismatching signal is rejected with 409 and
//! never retried.

use super::OkAck;
use crate::errors::RelayError;
use crate::observability::metrics::record_presence_event;
use crate::routes::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;

/// Body of an online/offline signal: the raw client-supplied peer key.
#[derive(Debug, Deserialize)]
pub struct PresenceSignal {
    pub peer: String,
}

/// Handler for POST /internal/v1/presence/online.
#[instrument(skip_all, name = "relay.presence.online")]
pub async fn presence_online(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(signal): Json<PresenceSignal>,
) -> Result<Json<OkAck>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let event = state
        .reconciler
        .reconcile_online(&signal.peer, &ctx.session_token)
        .await?;
    state.registry.apply(event).await?;
    record_presence_event("online");
    Ok(Json(OkAck::new()))
}

/// Handler for POST /internal/v1/presence/offline.
#[instrument(skip_all, name = "relay.presence.offline")]
pub async fn presence_offline(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(signal): Json<PresenceSignal>,
) -> Result<Json<OkAck>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let event = state
        .reconciler
        .reconcile_offline(&signal.peer, &ctx.session_token)
        .await?;
    state.registry.apply(event).await?;
    record_presence_event("offline");
    Ok(Json(OkAck::new()))
}

/// Handler for POST /internal/v1/presence/all-offline.
///
/// Deployment-wide reset used on startup/recovery; carries no session
/// and bypasses per-peer reconciliation.
#[instrument(skip_all, name = "relay.presence.all_offline")]
pub async fn presence_all_offline(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OkAck>, RelayError> {
    let event = state.reconciler.all_offline();
    state.registry.apply(event).await?;
    record_presence_event("all_offline");
    Ok(Json(OkAck::new()))
}
