//! Presence tracking: which peer instances are attached to which channel.
//!
//! Raw online/offline signals carry a client-supplied peer key and the
//! caller's session token. The [`PresenceReconciler`] turns them into
//! canonical [`PresenceEvent`]s (rejecting identity mismatches), and the
//! [`PresenceRegistry`] reduces those events into the current presence set.

mod reconciler;
mod registry;

pub use reconciler::PresenceReconciler;
pub use registry::PresenceRegistry;

use crate::errors::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One connected instance of a session attached to a channel.
///
/// The identity key is the deterministic composite
/// `channelType_channelId_sessionId_instanceId`; it doubles as the wire
/// representation passed between peers, so segments must not contain `_`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    /// Dot-namespaced channel type; the first segment is the category
    /// (e.g. `priv` vs everything else).
    #[serde(rename = "toType")]
    pub channel_type: String,
    /// Channel identifier.
    #[serde(rename = "toId")]
    pub channel_id: String,
    /// Canonical public-session identifier.
    #[serde(rename = "session")]
    pub session_id: String,
    /// Distinguishes multiple connections of the same session.
    #[serde(rename = "instance")]
    pub instance_id: String,
}

impl Peer {
    /// The composite identity key.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.channel_type, self.channel_id, self.session_id, self.instance_id
        )
    }

    /// Key prefix shared by every peer on a `(channelType, channelId)` pair.
    #[must_use]
    pub fn channel_prefix(channel_type: &str, channel_id: &str) -> String {
        format!("{channel_type}_{channel_id}_")
    }

    /// Parse a composite peer key.
    ///
    /// # Errors
    ///
    /// `RelayError::Validation` unless the key has exactly four non-empty
    /// `_`-separated segments.
    pub fn parse(key: &str) -> Result<Self, RelayError> {
        let mut segments = key.split('_');
        let (channel_type, channel_id, session_id, instance_id) = match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(t), Some(c), Some(s), Some(i), None)
                if !t.is_empty() && !c.is_empty() && !s.is_empty() && !i.is_empty() =>
            {
                (t, c, s, i)
            }
            _ => {
                return Err(RelayError::Validation(format!(
                    "malformed peer key: {key}"
                )))
            }
        };
        Ok(Self {
            channel_type: channel_type.to_string(),
            channel_id: channel_id.to_string(),
            session_id: session_id.to_string(),
            instance_id: instance_id.to_string(),
        })
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Ephemeral attached state for a peer; fully replaced on every update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerState {
    #[serde(rename = "audioState")]
    pub audio_state: String,
    #[serde(rename = "videoState")]
    pub video_state: String,
}

/// Canonical presence event produced by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    /// Peer came online (idempotent create).
    Online(Peer),
    /// Peer went offline (idempotent delete).
    Offline(Peer),
    /// Clear every peer record for this deployment (startup/reset recovery).
    AllOffline,
}
