//! HTTP routes and application state.

use crate::access::{AccessPolicy, SessionResolver};
use crate::config::Config;
use crate::handlers;
use crate::messages::{Message, MessageLog};
use crate::middleware::http_metrics_middleware;
use crate::presence::{PresenceReconciler, PresenceRegistry};
use crate::turn::TurnCredentialIssuer;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Capacity of the accepted-message fan-out channel. Slow SSE readers
/// that fall further behind than this re-sync via the range query.
pub const MESSAGE_FANOUT_CAPACITY: usize = 256;

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Presence registry over the durable store.
    pub registry: PresenceRegistry,

    /// Presence signal reconciler.
    pub reconciler: PresenceReconciler,

    /// Sequenced per-channel message log.
    pub log: MessageLog,

    /// TURN credential issuer.
    pub issuer: Arc<TurnCredentialIssuer>,

    /// Session-token resolution seam.
    pub resolver: Arc<dyn SessionResolver>,

    /// Channel access policy seam.
    pub policy: Arc<dyn AccessPolicy>,

    /// Fan-out of accepted messages to live SSE subscribers.
    pub message_events: broadcast::Sender<Message>,
}

impl AppState {
    /// Wire the state from its collaborators.
    pub fn new(
        config: Config,
        registry: PresenceRegistry,
        reconciler: PresenceReconciler,
        log: MessageLog,
        issuer: Arc<TurnCredentialIssuer>,
        resolver: Arc<dyn SessionResolver>,
        policy: Arc<dyn AccessPolicy>,
    ) -> Self {
        let (message_events, _) = broadcast::channel(MESSAGE_FANOUT_CAPACITY);
        Self {
            config,
            registry,
            reconciler,
            log,
            issuer,
            resolver,
            policy,
            message_events,
        }
    }
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - operational, unversioned.
/// - `/api/v1/...` - client surface, authenticated per-handler via the
///   session-token header.
/// - `/internal/v1/presence/...` - presence event inputs.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let operational_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let api_routes = Router::new()
        .route(
            "/api/v1/channels/:channel_type/:channel_id/peers",
            get(handlers::list_channel_peers),
        )
        .route(
            "/api/v1/peers/:peer/state",
            get(handlers::get_peer_state).put(handlers::put_peer_state),
        )
        .route("/api/v1/messages", post(handlers::post_message).get(handlers::query_messages))
        .route("/api/v1/messages/stream", get(handlers::stream_messages))
        .route("/api/v1/peers/:peer/turn", get(handlers::get_turn_credentials))
        .route(
            "/api/v1/peers/:peer/turn/stream",
            get(handlers::stream_turn_credentials),
        )
        .with_state(state.clone());

    let internal_routes = Router::new()
        .route("/internal/v1/presence/online", post(handlers::presence_online))
        .route("/internal/v1/presence/offline", post(handlers::presence_offline))
        .route(
            "/internal/v1/presence/all-offline",
            post(handlers::presence_all_offline),
        )
        .with_state(state);

    // Layer order (bottom-to-top execution): timeout, then request
    // tracing, then metrics outermost so framework-level errors are
    // counted too.
    operational_routes
        .merge(metrics_routes)
        .merge(api_routes)
        .merge(internal_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
