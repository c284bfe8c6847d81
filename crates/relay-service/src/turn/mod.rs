//! Ephemeral TURN credential issuance.
//!
//! Credentials follow the coturn shared-secret scheme: the username embeds
//! the expiry so the relay can reject stale credentials without a lookup,
//! and the password is an HMAC over the username so tampering with the
//! expiry invalidates the credential.

mod issuer;
mod subscription;

pub use issuer::TurnCredentialIssuer;
pub use subscription::TurnSubscription;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One short-lived TURN credential. Derived on demand, never stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct TurnCredentials {
    /// Relay endpoint URLs, verbatim from configuration.
    pub urls: Vec<String>,
    /// `<expiryUnixSeconds>:<nonce>`.
    pub username: String,
    /// Base64 HMAC-SHA1 of the username under the shared secret.
    pub credential: String,
    /// Seconds the credential remains valid from issuance.
    pub ttl: u64,
    /// Caller's observed network address, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_address: Option<String>,
}

/// The `credential` field is derived from the shared secret, so it is
/// redacted alongside it.
impl fmt::Debug for TurnCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnCredentials")
            .field("urls", &self.urls)
            .field("username", &self.username)
            .field("credential", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .field("client_address", &self.client_address)
            .finish()
    }
}
