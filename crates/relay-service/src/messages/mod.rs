//! Ordered per-channel message relay.
//!
//! Each accepted message gets a strictly increasing identifier from the
//! [`MessageSequencer`]; the [`MessageLog`] stores it under that identifier
//! and serves range queries. A channel here is the destination peer key:
//! every peer attached to a `(channelType, channelId)` pair shares the log
//! of messages addressed to it.

mod log;
mod sequencer;

pub use log::{MessageLog, MessageRange, DEFAULT_PAGE_LIMIT};
pub use sequencer::{MessageSequencer, SequenceDecision, DRIFT_TOLERANCE_MS};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One relayed payload on a channel. Created once on acceptance, never
/// mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Identifier `channelId_<RFC3339-millis>`; lexical order equals
    /// chronological order within a channel.
    pub id: String,
    /// Destination peer key (doubles as the channel identifier).
    pub to: String,
    /// Sender peer key.
    pub from: String,
    /// Application-defined message type.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Opaque structured payload.
    pub data: Value,
    /// Wall-clock time at acceptance.
    pub timestamp: DateTime<Utc>,
    /// Canonical session id of the sender, stamped at acceptance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Outcome of a post request. A drop is an intentional no-op, not an
/// error: the caller receives the same acknowledgement either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// Message was sequenced and appended.
    Accepted(Message),
    /// Message exceeded the channel's drift tolerance and was discarded.
    Dropped,
}

/// Render a millisecond timestamp as the sortable identifier suffix
/// (`2023-11-14T22:13:20.000Z` style, millisecond precision, `Z` offset).
#[must_use]
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_is_sortable() {
        // 1700000000000 ms = 2023-11-14T22:13:20.000Z
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14T22:13:20.000Z");

        // lexical order tracks numeric order across a second boundary
        let a = format_timestamp(1_700_000_000_999);
        let b = format_timestamp(1_700_000_001_000);
        assert!(a < b);
    }

    #[test]
    fn test_message_type_field_serializes_as_type() {
        let message = Message {
            id: "ch_2023-11-14T22:13:20.000Z".to_string(),
            to: "room.a_42_s1_i1".to_string(),
            from: "room.a_42_s2_i1".to_string(),
            msg_type: "chat".to_string(),
            data: serde_json::json!({ "text": "hi" }),
            timestamp: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap(),
            session: Some("s2".to_string()),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value.get("type").unwrap(), "chat");
        assert!(value.get("msg_type").is_none());
    }
}
