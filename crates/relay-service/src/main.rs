//! Peer Relay Service
//!
//! Entry point: presence tracking, ordered message relay, and TURN
//! credential issuance for peer-to-peer media sessions.

use relay_service::clients::AccessControlClient;
use relay_service::config::Config;
use relay_service::messages::MessageLog;
use relay_service::observability::metrics::init_metrics_recorder;
use relay_service::presence::{PresenceReconciler, PresenceRegistry};
use relay_service::routes::{self, AppState};
use relay_service::store::MemoryStore;
use relay_service::turn::TurnCredentialIssuer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Peer Relay");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        relay_id = %config.relay_id,
        bind_address = %config.bind_address,
        turn_urls = config.turn_urls.len(),
        turn_expire_seconds = config.turn_expire_seconds,
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to install metrics recorder: {}", e);
        e
    })?;

    // Credential issuer fails fast on a bad TURN configuration.
    let issuer = Arc::new(TurnCredentialIssuer::new(
        config.turn_urls.clone(),
        &config.turn_secret,
        config.turn_expire_seconds,
    )?);

    let access_control = Arc::new(AccessControlClient::new(config.access_control_url.clone())?);

    let store = Arc::new(MemoryStore::new());
    let registry = PresenceRegistry::new(store.clone());
    let reconciler = PresenceReconciler::new(access_control.clone());
    let log = MessageLog::new(store);

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState::new(
        config,
        registry,
        reconciler,
        log,
        issuer,
        access_control.clone(),
        access_control,
    ));

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Peer Relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Peer Relay shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
