use super::TurnCredentials;
use crate::errors::RelayError;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use ring::{
    hmac,
    rand::{SecureRandom, SystemRandom},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

/// Random nonce bytes per username; rendered as 10 hex characters.
const NONCE_BYTES: usize = 5;

/// Stateless credential factory bound to one shared secret and URL list.
pub struct TurnCredentialIssuer {
    urls: Vec<String>,
    key: hmac::Key,
    expire_seconds: u64,
    rng: SystemRandom,
}

impl TurnCredentialIssuer {
    /// Fails fast on an empty secret or URL list so a misconfigured
    /// deployment never serves unverifiable credentials.
    pub fn new(
        urls: Vec<String>,
        secret: &SecretString,
        expire_seconds: u64,
    ) -> Result<Self, RelayError> {
        if urls.is_empty() {
            return Err(RelayError::Config("TURN URL list is empty".to_string()));
        }
        if secret.expose_secret().is_empty() {
            return Err(RelayError::Config("TURN secret is empty".to_string()));
        }
        // SHA-1 is fixed by the TURN REST credential scheme.
        let key = hmac::Key::new(
            hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            secret.expose_secret().as_bytes(),
        );
        Ok(Self {
            urls,
            key,
            expire_seconds,
            rng: SystemRandom::new(),
        })
    }

    #[must_use]
    pub fn expire_seconds(&self) -> u64 {
        self.expire_seconds
    }

    /// Issue a credential valid for the configured window starting now.
    #[instrument(skip_all)]
    pub fn issue(&self, client_address: Option<String>) -> Result<TurnCredentials, RelayError> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        self.issue_at(now, client_address)
    }

    /// [`Self::issue`] at an explicit clock reading (test seam).
    pub fn issue_at(
        &self,
        now_secs: u64,
        client_address: Option<String>,
    ) -> Result<TurnCredentials, RelayError> {
        let expiry = now_secs.saturating_add(self.expire_seconds);
        let username = format!("{expiry}:{}", self.nonce()?);
        let signature = hmac::sign(&self.key, username.as_bytes());
        let credential = general_purpose::STANDARD.encode(signature.as_ref());

        Ok(TurnCredentials {
            urls: self.urls.clone(),
            username,
            credential,
            ttl: self.expire_seconds,
            client_address,
        })
    }

    /// Recompute the HMAC for a username and compare against a presented
    /// credential.
    #[must_use]
    pub fn verify(&self, username: &str, credential: &str) -> bool {
        let Ok(presented) = general_purpose::STANDARD.decode(credential) else {
            return false;
        };
        hmac::verify(&self.key, username.as_bytes(), &presented).is_ok()
    }

    fn nonce(&self) -> Result<String, RelayError> {
        let mut bytes = [0u8; NONCE_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| RelayError::Internal)?;
        Ok(hex::encode(bytes))
    }
}
