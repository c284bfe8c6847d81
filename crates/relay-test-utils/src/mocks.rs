//! Static mocks for the external collaborator seams.

use async_trait::async_trait;
use relay_service::access::{AccessPolicy, ClientContext, PublicSessionInfo, SessionResolver};
use relay_service::errors::RelayError;
use std::collections::HashMap;

/// Resolver backed by a fixed token-to-session map.
#[derive(Default)]
pub struct StaticSessionResolver {
    sessions: HashMap<String, String>,
}

impl StaticSessionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as resolving to the public session `public_id`.
    #[must_use]
    pub fn with_session(mut self, token: &str, public_id: &str) -> Self {
        self.sessions.insert(token.to_string(), public_id.to_string());
        self
    }
}

#[async_trait]
impl SessionResolver for StaticSessionResolver {
    async fn resolve_public_session(
        &self,
        session_token: &str,
    ) -> Result<PublicSessionInfo, RelayError> {
        match self.sessions.get(session_token) {
            Some(id) => Ok(PublicSessionInfo { id: id.clone() }),
            None => Err(RelayError::NotFound("session".to_string())),
        }
    }
}

/// Policy answering every check with fixed booleans.
pub struct StaticAccessPolicy {
    pub grant_roles: bool,
    pub grant_private: bool,
}

impl StaticAccessPolicy {
    pub fn allow_all() -> Self {
        Self {
            grant_roles: true,
            grant_private: true,
        }
    }

    pub fn deny_all() -> Self {
        Self {
            grant_roles: false,
            grant_private: false,
        }
    }
}

#[async_trait]
impl AccessPolicy for StaticAccessPolicy {
    async fn has_channel_role(
        &self,
        _category: &str,
        _channel_id: &str,
        _roles: &[&str],
        _ctx: &ClientContext,
    ) -> Result<bool, RelayError> {
        Ok(self.grant_roles)
    }

    async fn has_private_access(
        &self,
        _channel_id: &str,
        _ctx: &ClientContext,
    ) -> Result<bool, RelayError> {
        Ok(self.grant_private)
    }
}
