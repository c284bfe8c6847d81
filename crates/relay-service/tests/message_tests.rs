//! Message post and range query integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use relay_test_utils::{
    peer_key, StaticAccessPolicy, StaticSessionResolver, TestRelayServer, OTHER_SESSION_ID,
    OTHER_SESSION_TOKEN, TEST_SESSION_ID, TEST_SESSION_TOKEN,
};
use serde_json::json;

fn to_peer() -> String {
    peer_key("room.open", "42", OTHER_SESSION_ID, "inst-1")
}

fn from_peer() -> String {
    peer_key("room.open", "42", TEST_SESSION_ID, "inst-1")
}

async fn post_message(
    client: &reqwest::Client,
    base: &str,
    data: serde_json::Value,
) -> Result<reqwest::Response, anyhow::Error> {
    Ok(client
        .post(format!("{base}/api/v1/messages"))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .json(&json!({
            "to": to_peer(),
            "from": from_peer(),
            "type": "chat",
            "data": data,
        }))
        .send()
        .await?)
}

/// Test that a posted message comes back from the destination's log with
/// the stamped identity fields.
#[tokio::test]
async fn test_post_then_query_roundtrip() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = post_message(&client, &server.url(), json!({ "text": "hello" })).await?;
    assert_eq!(response.status(), 200);
    let ack: serde_json::Value = response.json().await?;
    assert_eq!(ack, json!({ "ok": true }));

    // The destination session reads its own log.
    let messages: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/messages", server.url()))
        .query(&[("peer", to_peer())])
        .header("x-session-token", OTHER_SESSION_TOKEN)
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(messages.len(), 1);
    let message = messages.first().unwrap();
    assert_eq!(message.get("to").and_then(|v| v.as_str()), Some(to_peer()).as_deref());
    assert_eq!(
        message.get("from").and_then(|v| v.as_str()),
        Some(from_peer()).as_deref()
    );
    assert_eq!(message.get("type").and_then(|v| v.as_str()), Some("chat"));
    assert_eq!(message.get("data"), Some(&json!({ "text": "hello" })));
    assert_eq!(
        message.get("session").and_then(|v| v.as_str()),
        Some(TEST_SESSION_ID)
    );
    let id = message.get("id").and_then(|v| v.as_str()).unwrap();
    assert!(
        id.starts_with(&format!("{}_", to_peer())),
        "message id {id} not scoped to the destination channel"
    );

    Ok(())
}

/// Test that query results come back oldest first by default.
#[tokio::test]
async fn test_query_orders_messages_oldest_first() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    for i in 0..3 {
        let response = post_message(&client, &server.url(), json!({ "seq": i })).await?;
        assert_eq!(response.status(), 200);
    }

    let messages: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/messages", server.url()))
        .query(&[("peer", to_peer())])
        .header("x-session-token", OTHER_SESSION_TOKEN)
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(messages.len(), 3);
    let ids: Vec<&str> = messages
        .iter()
        .map(|m| m.get("id").and_then(|v| v.as_str()).unwrap())
        .collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(ids, sorted, "ids not in ascending order: {ids:?}");

    let data: Vec<i64> = messages
        .iter()
        .map(|m| m.pointer("/data/seq").and_then(|v| v.as_i64()).unwrap())
        .collect();
    assert_eq!(data, vec![0, 1, 2]);

    Ok(())
}

/// Test that limit and reverse page from the newest end.
#[tokio::test]
async fn test_query_limit_and_reverse() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    for i in 0..3 {
        let response = post_message(&client, &server.url(), json!({ "seq": i })).await?;
        assert_eq!(response.status(), 200);
    }

    let messages: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/messages", server.url()))
        .query(&[("peer", to_peer()), ("limit", "1".to_string()), ("reverse", "true".to_string())])
        .header("x-session-token", OTHER_SESSION_TOKEN)
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(messages.len(), 1);
    let seq = messages
        .first()
        .and_then(|m| m.pointer("/data/seq"))
        .and_then(|v| v.as_i64());
    assert_eq!(seq, Some(2));

    Ok(())
}

/// Test that a message spanning two different channels is rejected.
#[tokio::test]
async fn test_cross_channel_post_returns_400() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/messages", server.url()))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .json(&json!({
            "to": peer_key("room.open", "99", OTHER_SESSION_ID, "inst-1"),
            "from": from_peer(),
            "type": "chat",
            "data": {},
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    Ok(())
}

/// Test that posting as a peer of another session is rejected with 409.
#[tokio::test]
async fn test_post_as_other_session_returns_409() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/messages", server.url()))
        .header("x-session-token", TEST_SESSION_TOKEN)
        .json(&json!({
            "to": from_peer(),
            "from": to_peer(),
            "type": "chat",
            "data": {},
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 409);

    Ok(())
}

/// Test that a denying policy rejects the post with 403.
#[tokio::test]
async fn test_post_denied_by_policy_returns_403() -> Result<(), anyhow::Error> {
    let resolver = StaticSessionResolver::new()
        .with_session(TEST_SESSION_TOKEN, TEST_SESSION_ID)
        .with_session(OTHER_SESSION_TOKEN, OTHER_SESSION_ID);
    let server = TestRelayServer::spawn_with(resolver, StaticAccessPolicy::deny_all()).await?;
    let client = reqwest::Client::new();

    let response = post_message(&client, &server.url(), json!({})).await?;
    assert_eq!(response.status(), 403);

    Ok(())
}

/// Test that a live stream receives a message posted after it connects.
#[tokio::test]
async fn test_stream_receives_posted_message() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    // Receiving the response headers means the fan-out subscription exists.
    let mut stream = client
        .get(format!("{}/api/v1/messages/stream", server.url()))
        .query(&[("peer", to_peer())])
        .header("x-session-token", OTHER_SESSION_TOKEN)
        .send()
        .await?;
    assert_eq!(stream.status(), 200);

    let response = post_message(&client, &server.url(), json!({ "text": "live" })).await?;
    assert_eq!(response.status(), 200);

    let chunk = stream
        .chunk()
        .await?
        .ok_or_else(|| anyhow::anyhow!("stream closed before delivering the message"))?;
    let text = String::from_utf8_lossy(&chunk);
    assert!(text.contains("data:"), "not an SSE event: {text}");
    assert!(text.contains("live"), "payload missing: {text}");

    Ok(())
}

/// Test that messages stay scoped to their destination channel.
#[tokio::test]
async fn test_query_isolates_channels() -> Result<(), anyhow::Error> {
    let server = TestRelayServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = post_message(&client, &server.url(), json!({ "text": "hi" })).await?;
    assert_eq!(response.status(), 200);

    // The sender's own log is untouched by the send.
    let messages: Vec<serde_json::Value> = client
        .get(format!("{}/api/v1/messages", server.url()))
        .query(&[("peer", from_peer())])
        .header("x-session-token", TEST_SESSION_TOKEN)
        .send()
        .await?
        .json()
        .await?;
    assert!(messages.is_empty());

    Ok(())
}
