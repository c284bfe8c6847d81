//! Test server harness for E2E testing.
//!
//! Provides `TestRelayServer` for spawning real relay server instances
//! bound to a random local port.

use crate::mocks::{StaticAccessPolicy, StaticSessionResolver};
use metrics_exporter_prometheus::PrometheusBuilder;
use relay_service::config::Config;
use relay_service::messages::MessageLog;
use relay_service::presence::{PresenceReconciler, PresenceRegistry};
use relay_service::routes::{self, AppState};
use relay_service::store::MemoryStore;
use relay_service::turn::TurnCredentialIssuer;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the relay server in E2E tests.
///
/// The default resolver accepts [`crate::TEST_SESSION_TOKEN`] and
/// [`crate::OTHER_SESSION_TOKEN`]; the default policy grants everything.
pub struct TestRelayServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestRelayServer {
    /// Spawn a server with the default mocks.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let resolver = StaticSessionResolver::new()
            .with_session(crate::TEST_SESSION_TOKEN, crate::TEST_SESSION_ID)
            .with_session(crate::OTHER_SESSION_TOKEN, crate::OTHER_SESSION_ID);
        Self::spawn_with(resolver, StaticAccessPolicy::allow_all()).await
    }

    /// Spawn a server with explicit seam implementations.
    pub async fn spawn_with(
        resolver: StaticSessionResolver,
        policy: StaticAccessPolicy,
    ) -> Result<Self, anyhow::Error> {
        let config = Config::from_vars(&crate::test_config_vars())
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let issuer = Arc::new(TurnCredentialIssuer::new(
            config.turn_urls.clone(),
            &config.turn_secret,
            config.turn_expire_seconds,
        )?);

        let store = Arc::new(MemoryStore::new());
        let registry = PresenceRegistry::new(store.clone());
        let resolver: Arc<StaticSessionResolver> = Arc::new(resolver);
        let reconciler = PresenceReconciler::new(resolver.clone());
        let log = MessageLog::new(store);

        let state = Arc::new(AppState::new(
            config,
            registry,
            reconciler,
            log,
            issuer,
            resolver,
            Arc::new(policy),
        ));

        // A per-process recorder handle without installing globally, so
        // multiple harnesses can coexist in one test binary.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Base URL of the running server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}
