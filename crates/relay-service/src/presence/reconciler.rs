//! Presence signal reconciliation.
//!
//! Raw signals are session-keyed and client-supplied, so they may be
//! duplicated, stale, or forged. The reconciler resolves the caller's
//! session token to its canonical public-session id and only emits a
//! presence event when it matches the session segment embedded in the raw
//! peer key. A mismatching signal is dropped, not retried: it indicates a
//! stale or forged key and retrying would not change the outcome.

use super::{Peer, PresenceEvent};
use crate::access::SessionResolver;
use crate::errors::RelayError;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Translates raw online/offline signals into canonical [`PresenceEvent`]s.
pub struct PresenceReconciler {
    resolver: Arc<dyn SessionResolver>,
}

impl PresenceReconciler {
    #[must_use]
    pub fn new(resolver: Arc<dyn SessionResolver>) -> Self {
        Self { resolver }
    }

    /// Reconcile a raw "online" signal.
    #[instrument(skip_all, fields(peer = %raw_peer_key))]
    pub async fn reconcile_online(
        &self,
        raw_peer_key: &str,
        session_token: &str,
    ) -> Result<PresenceEvent, RelayError> {
        let peer = self.resolve(raw_peer_key, session_token).await?;
        debug!(target: "relay.presence", peer = %peer, "Peer online reconciled");
        Ok(PresenceEvent::Online(peer))
    }

    /// Reconcile a raw "offline" signal.
    #[instrument(skip_all, fields(peer = %raw_peer_key))]
    pub async fn reconcile_offline(
        &self,
        raw_peer_key: &str,
        session_token: &str,
    ) -> Result<PresenceEvent, RelayError> {
        let peer = self.resolve(raw_peer_key, session_token).await?;
        debug!(target: "relay.presence", peer = %peer, "Peer offline reconciled");
        Ok(PresenceEvent::Offline(peer))
    }

    /// The global "all offline" signal bypasses per-peer resolution: it is
    /// a deployment-wide broadcast used for startup/reset recovery.
    #[must_use]
    pub fn all_offline(&self) -> PresenceEvent {
        PresenceEvent::AllOffline
    }

    /// Resolve the session token and verify the raw key's claimed session.
    async fn resolve(
        &self,
        raw_peer_key: &str,
        session_token: &str,
    ) -> Result<Peer, RelayError> {
        let mut peer = Peer::parse(raw_peer_key)?;
        let public = self.resolver.resolve_public_session(session_token).await?;
        if public.id != peer.session_id {
            warn!(
                target: "relay.presence",
                peer = %raw_peer_key,
                "Presence signal claimed a session that is not the caller's"
            );
            return Err(RelayError::IdentityMismatch);
        }
        // Canonical id wins even though equality makes this a no-op today.
        peer.session_id = public.id;
        Ok(peer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::access::PublicSessionInfo;
    use async_trait::async_trait;

    /// Resolver that maps one token to one public session id.
    struct OneToken {
        token: &'static str,
        public_id: &'static str,
    }

    #[async_trait]
    impl SessionResolver for OneToken {
        async fn resolve_public_session(
            &self,
            session_token: &str,
        ) -> Result<PublicSessionInfo, RelayError> {
            if session_token == self.token {
                Ok(PublicSessionInfo {
                    id: self.public_id.to_string(),
                })
            } else {
                Err(RelayError::NotFound("session".to_string()))
            }
        }
    }

    fn reconciler() -> PresenceReconciler {
        PresenceReconciler::new(Arc::new(OneToken {
            token: "tok-1",
            public_id: "sess-1",
        }))
    }

    #[tokio::test]
    async fn test_online_with_matching_session() {
        let event = reconciler()
            .reconcile_online("room.a_42_sess-1_inst-1", "tok-1")
            .await
            .unwrap();
        let PresenceEvent::Online(peer) = event else {
            panic!("expected online event");
        };
        assert_eq!(peer.session_id, "sess-1");
        assert_eq!(peer.instance_id, "inst-1");
    }

    #[tokio::test]
    async fn test_claimed_session_mismatch_is_rejected() {
        let err = reconciler()
            .reconcile_online("room.a_42_sess-OTHER_inst-1", "tok-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::IdentityMismatch));
    }

    #[tokio::test]
    async fn test_offline_mismatch_is_rejected_too() {
        let err = reconciler()
            .reconcile_offline("room.a_42_sess-OTHER_inst-1", "tok-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::IdentityMismatch));
    }

    #[tokio::test]
    async fn test_unknown_token_propagates_not_found() {
        let err = reconciler()
            .reconcile_online("room.a_42_sess-1_inst-1", "tok-unknown")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_key_is_validation_error() {
        let err = reconciler()
            .reconcile_online("not-a-peer-key", "tok-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[test]
    fn test_all_offline_is_broadcast() {
        assert_eq!(reconciler().all_offline(), PresenceEvent::AllOffline);
    }
}
