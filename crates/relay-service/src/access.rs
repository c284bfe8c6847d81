//! External collaborator seams: session resolution and access policy.
//!
//! The relay core contains no authorization logic of its own. Handlers
//! consume these traits; production wiring uses the HTTP
//! [`crate::clients::AccessControlClient`], tests use static mocks.

use crate::errors::RelayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Roles that may read a channel's peer listing.
pub const CHANNEL_READ_ROLES: &[&str] = &["reader", "speaker", "vip", "moderator", "owner"];

/// Roles that may post messages and mutate peer state on a channel.
pub const CHANNEL_WRITE_ROLES: &[&str] = &["speaker", "vip", "moderator", "owner"];

/// Channel-type category reserved for private conversations.
/// `priv.*` channels use the private-access rule instead of role checks.
pub const PRIVATE_CATEGORY: &str = "priv";

/// Canonical public identity of a connecting client, resolved from an
/// opaque session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicSessionInfo {
    /// Public session identifier (the `sessionId` segment of peer keys).
    pub id: String,
}

/// Per-request caller context passed to the access policy.
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// Opaque session token presented by the caller.
    pub session_token: String,
    /// Observed network address of the caller, if known.
    pub remote_addr: Option<String>,
}

/// Resolves opaque session tokens to canonical public-session identities.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Resolve `session_token` to its public session.
    ///
    /// # Errors
    ///
    /// `RelayError::NotFound` when the token is invalid or expired.
    async fn resolve_public_session(
        &self,
        session_token: &str,
    ) -> Result<PublicSessionInfo, RelayError>;
}

/// Channel access policy.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Whether the caller holds any of `roles` on the channel.
    async fn has_channel_role(
        &self,
        category: &str,
        channel_id: &str,
        roles: &[&str],
        ctx: &ClientContext,
    ) -> Result<bool, RelayError>;

    /// Whether the caller participates in the private conversation
    /// `channel_id` (used for `priv.*` channel types).
    async fn has_private_access(
        &self,
        channel_id: &str,
        ctx: &ClientContext,
    ) -> Result<bool, RelayError>;
}

/// Channel-category dispatch used by every command/query on a channel:
/// `priv.*` channels check private access, everything else checks roles.
pub async fn check_channel_access(
    policy: &dyn AccessPolicy,
    channel_type: &str,
    channel_id: &str,
    roles: &[&str],
    ctx: &ClientContext,
) -> Result<(), RelayError> {
    let category = channel_type.split('.').next().unwrap_or(channel_type);
    let granted = if category == PRIVATE_CATEGORY {
        policy.has_private_access(channel_id, ctx).await?
    } else {
        policy.has_channel_role(category, channel_id, roles, ctx).await?
    };
    if granted {
        Ok(())
    } else {
        Err(RelayError::AccessDenied)
    }
}

/// Role-only check, without the private-category dispatch. The peer
/// listing applies the reader role set to every channel type, `priv.*`
/// included.
pub async fn check_channel_role(
    policy: &dyn AccessPolicy,
    channel_type: &str,
    channel_id: &str,
    roles: &[&str],
    ctx: &ClientContext,
) -> Result<(), RelayError> {
    let category = channel_type.split('.').next().unwrap_or(channel_type);
    if policy.has_channel_role(category, channel_id, roles, ctx).await? {
        Ok(())
    } else {
        Err(RelayError::AccessDenied)
    }
}
