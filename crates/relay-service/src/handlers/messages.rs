//! Message post, range query, and live stream handlers.

use super::OkAck;
use crate::errors::RelayError;
use crate::messages::{Message, MessageRange, PostOutcome};
use crate::observability::metrics::record_message_post;
use crate::presence::Peer;
use crate::routes::AppState;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Destination peer key (doubles as the channel identifier).
    pub to: String,
    /// Sender peer key.
    pub from: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct MessageQueryParams {
    /// Destination peer key whose log is queried.
    pub peer: String,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub limit: Option<usize>,
    pub reverse: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MessageStreamParams {
    /// Destination peer key whose log is observed.
    pub peer: String,
}

/// Handler for POST /api/v1/messages.
///
/// A message that outruns the channel's drift tolerance is dropped
/// without telling the caller: the ack is identical either way.
#[instrument(skip_all, name = "relay.messages.post", fields(to = %request.to))]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<OkAck>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let to = Peer::parse(&request.to)?;
    let from = Peer::parse(&request.from)?;

    if to.channel_type != from.channel_type || to.channel_id != from.channel_id {
        return Err(RelayError::Validation(
            "to and from must address the same channel".to_string(),
        ));
    }

    let public =
        super::resolve_matching_session(state.resolver.as_ref(), &ctx, &from.session_id).await?;
    crate::access::check_channel_access(
        state.policy.as_ref(),
        &to.channel_type,
        &to.channel_id,
        crate::access::CHANNEL_WRITE_ROLES,
        &ctx,
    )
    .await?;

    let outcome = state
        .log
        .post(
            &request.to,
            &request.from,
            &request.msg_type,
            request.data,
            Some(public.id),
        )
        .await?;

    match outcome {
        PostOutcome::Accepted(message) => {
            record_message_post("accepted");
            // Nobody listening is fine; the log remains the source of truth.
            let _ = state.message_events.send(message);
        }
        PostOutcome::Dropped => record_message_post("dropped"),
    }

    Ok(Json(OkAck::new()))
}

/// Handler for GET /api/v1/messages.
#[instrument(skip_all, name = "relay.messages.query", fields(peer = %params.peer))]
pub async fn query_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessageQueryParams>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Message>>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let peer = Peer::parse(&params.peer)?;
    super::resolve_matching_session(state.resolver.as_ref(), &ctx, &peer.session_id).await?;

    let range = MessageRange {
        gt: params.gt,
        gte: params.gte,
        lt: params.lt,
        lte: params.lte,
        limit: params.limit,
        reverse: params.reverse.unwrap_or(false),
    };
    let messages = state.log.query(&params.peer, &range).await?;
    Ok(Json(messages))
}

/// Handler for GET /api/v1/messages/stream.
///
/// SSE fan-out of messages accepted for the peer's channel after the
/// stream starts; earlier messages are fetched via the range query.
#[instrument(skip_all, name = "relay.messages.stream", fields(peer = %params.peer))]
pub async fn stream_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessageStreamParams>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, RelayError> {
    let ctx = super::client_context(&headers, connect_info.map(|ConnectInfo(addr)| addr))?;
    let peer = Peer::parse(&params.peer)?;
    super::resolve_matching_session(state.resolver.as_ref(), &ctx, &peer.session_id).await?;

    let channel_key = params.peer;
    let stream = BroadcastStream::new(state.message_events.subscribe()).filter_map(move |item| {
        match item {
            Ok(message) if message.to == channel_key => Some(Event::default().json_data(&message)),
            // Other channels' messages and lag gaps are skipped; a lagged
            // reader re-syncs through the range query.
            _ => None,
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
