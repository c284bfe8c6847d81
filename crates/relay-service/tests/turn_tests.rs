//! TURN credential endpoint integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use relay_test_utils::{
    peer_key, test_peer_key, StaticAccessPolicy, StaticSessionResolver, TestRelayServer,
    OTHER_SESSION_ID, TEST_SESSION_ID, TEST_SESSION_TOKEN,
};

/// Test that a one-shot issuance returns a well-formed credential set.
#[tokio::test]
async fn test_get_turn_credentials() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/api/v1/peers/{}/turn",
            server.url(),
            test_peer_key()
        ))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(
        body.get("urls"),
        Some(&serde_json::json!(["turn:relay.example.com:3478"]))
    );
    assert_eq!(body.get("ttl").and_then(|v| v.as_u64()), Some(3600));

    // coturn scheme: "<expiryUnixSeconds>:<nonce>" with a 10-hex nonce.
    let username = body.get("username").and_then(|v| v.as_str()).unwrap();
    let (expiry, nonce) = username.split_once(':').unwrap();
    assert!(expiry.parse::<u64>().is_ok(), "bad expiry: {expiry}");
    assert_eq!(nonce.len(), 10);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));

    let credential = body.get("credential").and_then(|v| v.as_str()).unwrap();
    assert!(!credential.is_empty());

    // Served over a real socket, so the caller's address is observed.
    assert!(body.get("client_address").is_some());

    Ok(())
}

/// Test that successive issuances carry distinct usernames.
#[tokio::test]
async fn test_issuances_are_distinct() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/peers/{}/turn", server.url(), test_peer_key());

    async fn issue(client: &reqwest::Client, url: &str) -> Result<String, anyhow::Error> {
        let body: serde_json::Value = client
            .get(url)
            .header("x-session-token", TEST_SESSION_TOKEN)
            .send()
            .await?
            .json()
            .await?;
        Ok(body
            .get("username")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string())
    }

    let first = issue(&client, &url).await?;
    let second = issue(&client, &url).await?;
    assert_ne!(first, second);

    Ok(())
}

/// Test that requesting credentials for another session's peer is rejected.
#[tokio::test]
async fn test_turn_for_other_session_returns_409() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();
    let foreign = peer_key("room.open", "42", OTHER_SESSION_ID, "inst-1");

    let response = client
        .get(format!("{}/api/v1/peers/{foreign}/turn", server.url()))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .send()
        .await?;
    assert_eq!(response.status(), 409);

    Ok(())
}

/// Test that a denying access policy rejects issuance for the peer's
/// own session.
#[tokio::test]
async fn test_turn_denied_by_policy_returns_403() -> Result<(), anyhow::Error> {
    let resolver =
        StaticSessionResolver::new().with_session(TEST_SESSION_TOKEN, TEST_SESSION_ID);
    let server = TestRelayServer::spawn_with(resolver, StaticAccessPolicy::deny_all()).await?;
    let client = reqwest::Client::new();

    for endpoint in ["turn", "turn/stream"] {
        let response = client
            .get(format!(
                "{}/api/v1/peers/{}/{endpoint}",
                server.url(),
                test_peer_key()
            ))
            .header("x-session-token", TEST_SESSION_TOKEN)
            .send()
            .await?;
        assert_eq!(response.status(), 403);
    }

    Ok(())
}

/// Test that the SSE subscription pushes a credential immediately.
#[tokio::test]
async fn test_turn_stream_pushes_first_credential() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let mut response = client
        .get(format!(
            "{}/api/v1/peers/{}/turn/stream",
            server.url(),
            test_peer_key()
        ))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    assert!(
        content_type.is_some_and(|ct| ct.contains("text/event-stream")),
        "Expected text/event-stream content type, got {:?}",
        content_type
    );

    // The first event arrives without waiting out a refresh interval.
    let chunk = response.chunk().await?.ok_or_else(|| {
        anyhow::anyhow!("stream closed before the first credential")
    })?;
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("data:"), "not an SSE event: {text}");
    assert!(text.contains("username"), "no credential payload: {text}");

    Ok(())
}
