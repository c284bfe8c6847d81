//! Common fixtures for relay tests.

use std::collections::HashMap;

/// Session token the default harness resolver accepts.
pub const TEST_SESSION_TOKEN: &str = "test-session-token";

/// Public session id the default token resolves to.
pub const TEST_SESSION_ID: &str = "sess-test";

/// Second token/session pair for cross-identity tests.
pub const OTHER_SESSION_TOKEN: &str = "other-session-token";
pub const OTHER_SESSION_ID: &str = "sess-other";

/// Compose a peer key from its four segments.
pub fn peer_key(channel_type: &str, channel_id: &str, session_id: &str, instance_id: &str) -> String {
    format!("{channel_type}_{channel_id}_{session_id}_{instance_id}")
}

/// Peer key for the default test session on an open room channel.
pub fn test_peer_key() -> String {
    peer_key("room.open", "42", TEST_SESSION_ID, "inst-1")
}

/// Environment map accepted by `Config::from_vars` for tests.
pub fn test_config_vars() -> HashMap<String, String> {
    HashMap::from([
        (
            "TURN_URLS".to_string(),
            "turn:relay.example.com:3478".to_string(),
        ),
        ("TURN_SECRET".to_string(), "s3cr3t".to_string()),
        ("RELAY_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        (
            "ACCESS_CONTROL_URL".to_string(),
            "http://localhost:8081".to_string(),
        ),
        ("RELAY_ID".to_string(), "relay-test".to_string()),
    ])
}
