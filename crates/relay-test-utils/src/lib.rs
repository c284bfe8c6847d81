//! # Relay Test Utilities
//!
//! Shared test utilities for the Peer Relay service:
//! - Static mocks for the session-resolution and access-policy seams
//! - Fixtures for peer keys and test configuration
//! - `TestRelayServer` harness for E2E tests over a real socket
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestRelayServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/health", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod fixtures;
pub mod mocks;
pub mod server_harness;

pub use fixtures::*;
pub use mocks::*;
pub use server_harness::*;
