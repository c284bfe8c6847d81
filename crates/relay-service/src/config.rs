//! Relay service configuration.
//!
//! Configuration is loaded from environment variables. The TURN shared
//! secret is held in a [`SecretString`] and redacted in Debug output.
//!
//! The credential subsystem fails fast: a missing `TURN_URLS` or
//! `TURN_SECRET` aborts startup rather than failing per-request.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default access-control service base URL.
pub const DEFAULT_ACCESS_CONTROL_URL: &str = "http://localhost:8081";

/// Default TURN credential validity window in seconds (1 hour).
pub const DEFAULT_TURN_EXPIRE_SECONDS: u64 = 3600;

/// Default relay instance ID prefix.
pub const DEFAULT_RELAY_ID_PREFIX: &str = "relay";

/// Relay service configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Base URL of the access-control service (session resolution and
    /// channel role checks).
    pub access_control_url: String,

    /// TURN relay endpoint URLs, in preference order.
    pub turn_urls: Vec<String>,

    /// Shared TURN secret used to sign ephemeral credentials.
    /// Protected by `SecretString` to prevent accidental logging.
    pub turn_secret: SecretString,

    /// TURN credential validity window in seconds (default: 3600).
    pub turn_expire_seconds: u64,

    /// Unique identifier for this relay instance.
    pub relay_id: String,
}

/// Custom Debug implementation that redacts the TURN secret.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("access_control_url", &self.access_control_url)
            .field("turn_urls", &self.turn_urls)
            .field("turn_secret", &"[REDACTED]")
            .field("turn_expire_seconds", &self.turn_expire_seconds)
            .field("relay_id", &self.relay_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let turn_urls: Vec<String> = vars
            .get("TURN_URLS")
            .ok_or_else(|| ConfigError::MissingEnvVar("TURN_URLS".to_string()))?
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if turn_urls.is_empty() {
            return Err(ConfigError::InvalidValue(
                "TURN_URLS must contain at least one URL".to_string(),
            ));
        }

        let turn_secret = vars
            .get("TURN_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("TURN_SECRET".to_string()))?;
        let turn_secret = SecretString::from(turn_secret.clone());

        let turn_expire_seconds = match vars.get("TURN_EXPIRE_SECONDS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("TURN_EXPIRE_SECONDS is not a number: {raw}"))
            })?,
            None => DEFAULT_TURN_EXPIRE_SECONDS,
        };

        if turn_expire_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "TURN_EXPIRE_SECONDS must be positive".to_string(),
            ));
        }

        let bind_address = vars
            .get("RELAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let access_control_url = vars
            .get("ACCESS_CONTROL_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACCESS_CONTROL_URL.to_string());

        let relay_id = vars.get("RELAY_ID").cloned().unwrap_or_else(|| {
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_RELAY_ID_PREFIX}-{short_suffix}")
        });

        Ok(Config {
            bind_address,
            access_control_url,
            turn_urls,
            turn_secret,
            turn_expire_seconds,
            relay_id,
        })
    }
}
