//! Presence registry: the reduced view of canonical presence events.
//!
//! The registry is a pure reducer over [`PresenceEvent`]s: create and
//! delete are idempotent and a same-key create/delete pair commutes with
//! itself, so replaying an event log after restart reproduces the same
//! presence set. It also owns the ephemeral per-peer attached state
//! (full replace, no history).

use super::{Peer, PeerState, PresenceEvent};
use crate::errors::RelayError;
use crate::store::{RangeQuery, RangeStore};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Store table holding one record per live peer, keyed by peer key.
const PEERS_TABLE: &str = "peers";

/// Store table holding attached state, keyed 1:1 by peer key.
const PEER_STATE_TABLE: &str = "peer_state";

/// Mapping of channels to their currently attached peer instances.
pub struct PresenceRegistry {
    store: Arc<dyn RangeStore>,
}

impl PresenceRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn RangeStore>) -> Self {
        Self { store }
    }

    /// Apply one canonical presence event.
    pub async fn apply(&self, event: PresenceEvent) -> Result<(), RelayError> {
        match event {
            PresenceEvent::Online(peer) => self.apply_online(&peer).await,
            PresenceEvent::Offline(peer) => self.apply_offline(&peer).await,
            PresenceEvent::AllOffline => self.apply_all_offline().await,
        }
    }

    /// Idempotent create: applying the same online event twice leaves
    /// exactly one record.
    #[instrument(skip_all, fields(peer = %peer))]
    pub async fn apply_online(&self, peer: &Peer) -> Result<(), RelayError> {
        let value = serde_json::to_value(peer)
            .map_err(|e| RelayError::Store(format!("peer encode: {e}")))?;
        self.store.put(PEERS_TABLE, &peer.key(), value).await?;
        debug!(target: "relay.presence", peer = %peer, "Peer record created");
        Ok(())
    }

    /// Idempotent delete: removing a non-existent peer is a no-op.
    #[instrument(skip_all, fields(peer = %peer))]
    pub async fn apply_offline(&self, peer: &Peer) -> Result<(), RelayError> {
        self.store.delete(PEERS_TABLE, &peer.key()).await?;
        debug!(target: "relay.presence", peer = %peer, "Peer record removed");
        Ok(())
    }

    /// Clear every peer record via a range scan.
    ///
    /// Safe to run concurrently with online/offline traffic: a record
    /// created during the clear may or may not survive, but each removal
    /// is a single point delete, so nothing is left half-deleted.
    pub async fn apply_all_offline(&self) -> Result<(), RelayError> {
        let removed = self
            .store
            .clear_range(PEERS_TABLE, &RangeQuery::all())
            .await?;
        info!(target: "relay.presence", removed, "All peers cleared");
        Ok(())
    }

    /// List active peers for a channel, optionally narrowed to one
    /// instance id.
    pub async fn list_peers(
        &self,
        channel_type: &str,
        channel_id: &str,
        instance_id: Option<&str>,
    ) -> Result<Vec<Peer>, RelayError> {
        let prefix = Peer::channel_prefix(channel_type, channel_id);
        let rows = self
            .store
            .range(PEERS_TABLE, &RangeQuery::prefix(&prefix))
            .await?;
        let mut peers = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            let peer: Peer = serde_json::from_value(value)
                .map_err(|e| RelayError::Store(format!("peer decode {key}: {e}")))?;
            if instance_id.is_none_or(|wanted| peer.instance_id == wanted) {
                peers.push(peer);
            }
        }
        Ok(peers)
    }

    /// Replace the attached state for a peer (no merge, no history).
    pub async fn set_peer_state(
        &self,
        peer_key: &str,
        state: &PeerState,
    ) -> Result<(), RelayError> {
        let value = serde_json::to_value(state)
            .map_err(|e| RelayError::Store(format!("peer state encode: {e}")))?;
        self.store.put(PEER_STATE_TABLE, peer_key, value).await
    }

    /// Fetch the attached state for a peer, if any was ever set.
    pub async fn peer_state(&self, peer_key: &str) -> Result<Option<PeerState>, RelayError> {
        let Some(value) = self.store.get(PEER_STATE_TABLE, peer_key).await? else {
            return Ok(None);
        };
        let state = serde_json::from_value(value)
            .map_err(|e| RelayError::Store(format!("peer state decode: {e}")))?;
        Ok(Some(state))
    }
}
