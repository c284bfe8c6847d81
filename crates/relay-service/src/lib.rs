//! Peer Relay Service Library
//!
//! Signaling relay for peer-to-peer media sessions:
//!
//! - Presence: which peer instances are attached to which channel
//! - Messaging: strictly ordered per-channel message log with fan-out
//! - TURN: short-lived media-relay credentials from a shared secret
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> presence|messages|turn -> store
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `access` - Session resolution and channel access seams
//! - `clients` - Access-control service HTTP client
//! - `store` - Ordered key-value store abstraction
//! - `presence` - Peer registry and signal reconciliation
//! - `messages` - Sequencer and append-only message log
//! - `turn` - Credential issuer and self-renewing subscription
//! - `handlers` - HTTP request handlers
//! - `routes` - Axum router setup

pub mod access;
pub mod clients;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod messages;
pub mod middleware;
pub mod observability;
pub mod presence;
pub mod routes;
pub mod store;
pub mod turn;
