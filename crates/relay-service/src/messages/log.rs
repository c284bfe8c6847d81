//! Append-only, range-queryable message log.
//!
//! Messages are stored under `channelId_<RFC3339-millis>` keys so that a
//! lexical range scan returns them in chronological order. Range bounds
//! are accepted either as full identifiers or as bare timestamp suffixes;
//! both are normalized to full identifiers scoped to the channel, so
//! callers can use the two forms interchangeably.

use super::{format_timestamp, Message, MessageSequencer, PostOutcome, SequenceDecision};
use crate::errors::RelayError;
use crate::store::{RangeQuery, RangeStore, HIGH_SENTINEL};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Store table holding one record per accepted message.
const MESSAGES_TABLE: &str = "messages";

/// Page size applied when the caller omits a limit.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Caller-supplied range bounds for a message query. Each bound may be a
/// full message identifier or just its timestamp suffix.
#[derive(Debug, Clone, Default)]
pub struct MessageRange {
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub limit: Option<usize>,
    pub reverse: bool,
}

/// Ordered, append-only store of sequenced messages.
pub struct MessageLog {
    store: Arc<dyn RangeStore>,
    sequencer: MessageSequencer,
}

impl MessageLog {
    #[must_use]
    pub fn new(store: Arc<dyn RangeStore>) -> Self {
        Self {
            store,
            sequencer: MessageSequencer::new(),
        }
    }

    /// Sequence and append one post addressed to the peer `to`.
    ///
    /// The sequencer's invariant guarantees the computed key never
    /// collides, so the append never overwrites. A `Dropped` outcome is
    /// not an error; the caller acknowledges it exactly like a success.
    #[instrument(skip_all, fields(channel = %to))]
    pub async fn post(
        &self,
        to: &str,
        from: &str,
        msg_type: &str,
        data: Value,
        session: Option<String>,
    ) -> Result<PostOutcome, RelayError> {
        self.post_at(to, from, msg_type, data, session, Utc::now())
            .await
    }

    /// [`Self::post`] at an explicit clock reading (test seam).
    pub async fn post_at(
        &self,
        to: &str,
        from: &str,
        msg_type: &str,
        data: Value,
        session: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PostOutcome, RelayError> {
        let channel_id = to;
        let timestamp_ms = match self.sequencer.assign_at(channel_id, now.timestamp_millis()) {
            SequenceDecision::Assigned { timestamp_ms } => timestamp_ms,
            SequenceDecision::Dropped => {
                debug!(
                    target: "relay.messages",
                    channel = %channel_id,
                    "Channel ahead of drift tolerance, message dropped"
                );
                return Ok(PostOutcome::Dropped);
            }
        };

        let message = Message {
            id: format!("{channel_id}_{}", format_timestamp(timestamp_ms)),
            to: to.to_string(),
            from: from.to_string(),
            msg_type: msg_type.to_string(),
            data,
            timestamp: now,
            session,
        };

        let value = serde_json::to_value(&message)
            .map_err(|e| RelayError::Store(format!("message encode: {e}")))?;
        self.store.put(MESSAGES_TABLE, &message.id, value).await?;

        Ok(PostOutcome::Accepted(message))
    }

    /// Query messages on a channel within the given bounds, oldest first
    /// unless `reverse` is set. A channel with no messages yields an
    /// empty vec, never an error.
    pub async fn query(
        &self,
        channel_id: &str,
        range: &MessageRange,
    ) -> Result<Vec<Message>, RelayError> {
        let query = normalize_range(channel_id, range);
        let rows = self.store.range(MESSAGES_TABLE, &query).await?;
        let mut messages = Vec::with_capacity(rows.len());
        for (key, value) in rows {
            let message: Message = serde_json::from_value(value)
                .map_err(|e| RelayError::Store(format!("message decode {key}: {e}")))?;
            messages.push(message);
        }
        Ok(messages)
    }
}

/// The timestamp suffix of a bound given in either form: everything after
/// the last `_` of a full identifier, or the value itself.
fn bound_suffix(bound: &str) -> &str {
    bound.rsplit('_').next().unwrap_or(bound)
}

/// Normalize caller bounds to full identifiers scoped to `channel_id`.
///
/// Defaults reproduce the original wire behavior: no lower bound scans
/// from `channel_`, no upper bound scans to the channel's high sentinel,
/// and an omitted limit caps the page at [`DEFAULT_PAGE_LIMIT`].
fn normalize_range(channel_id: &str, range: &MessageRange) -> RangeQuery {
    let scope = |bound: &str| format!("{channel_id}_{}", bound_suffix(bound));

    let gt = match (&range.gt, &range.gte) {
        (Some(gt), _) => Some(scope(gt)),
        (None, Some(_)) => None,
        (None, None) => Some(format!("{channel_id}_")),
    };
    let lte = match (&range.lte, &range.lt) {
        (Some(lte), _) => Some(scope(lte)),
        (None, Some(_)) => None,
        (None, None) => Some(format!("{channel_id}_{HIGH_SENTINEL}")),
    };

    RangeQuery {
        gt,
        gte: range.gte.as_deref().map(scope),
        lt: range.lt.as_deref().map(scope),
        lte,
        limit: Some(range.limit.unwrap_or(DEFAULT_PAGE_LIMIT)),
        reverse: range.reverse,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::messages::DRIFT_TOLERANCE_MS;
    use crate::store::MemoryStore;
    use serde_json::json;

    const CHANNEL: &str = "room.priv_42_s1_i1";
    const FROM: &str = "room.priv_42_s2_i1";

    fn log() -> MessageLog {
        MessageLog::new(Arc::new(MemoryStore::new()))
    }

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(ms).unwrap()
    }

    async fn accepted(log: &MessageLog, now_ms: i64) -> Message {
        match log
            .post_at(CHANNEL, FROM, "chat", json!({}), None, at(now_ms))
            .await
            .unwrap()
        {
            PostOutcome::Accepted(message) => message,
            PostOutcome::Dropped => unreachable!("expected acceptance"),
        }
    }

    #[test]
    fn test_bound_suffix_accepts_both_forms() {
        let full = "room.priv_42_s1_i1_2023-11-14T22:13:20.000Z";
        assert_eq!(bound_suffix(full), "2023-11-14T22:13:20.000Z");
        assert_eq!(
            bound_suffix("2023-11-14T22:13:20.000Z"),
            "2023-11-14T22:13:20.000Z"
        );
    }

    #[test]
    fn test_normalize_defaults_cover_whole_channel() {
        let query = normalize_range("ch", &MessageRange::default());
        assert_eq!(query.gt.as_deref(), Some("ch_"));
        assert_eq!(query.lte.as_deref(), Some(&*format!("ch_{HIGH_SENTINEL}")));
        assert_eq!(query.gte, None);
        assert_eq!(query.lt, None);
        assert_eq!(query.limit, Some(DEFAULT_PAGE_LIMIT));
    }

    #[test]
    fn test_normalize_explicit_bounds_suppress_defaults() {
        let range = MessageRange {
            gte: Some("2023-01-01T00:00:00.000Z".to_string()),
            lt: Some("2023-02-01T00:00:00.000Z".to_string()),
            ..MessageRange::default()
        };
        let query = normalize_range("ch", &range);
        assert_eq!(query.gt, None);
        assert_eq!(query.gte.as_deref(), Some("ch_2023-01-01T00:00:00.000Z"));
        assert_eq!(query.lt.as_deref(), Some("ch_2023-02-01T00:00:00.000Z"));
        assert_eq!(query.lte, None);
    }

    #[tokio::test]
    async fn test_same_millisecond_posts_get_distinct_increasing_ids() {
        let log = log();
        let t = 1_700_000_000_000;
        let first = accepted(&log, t).await;
        let second = accepted(&log, t).await;
        let third = accepted(&log, t).await;

        assert!(first.id < second.id);
        assert!(second.id < third.id);

        // The full same-millisecond burst is visible to a range query over
        // [T, T+2 units].
        let range = MessageRange {
            gte: Some(format_timestamp(t)),
            lte: Some(format_timestamp(t + 2)),
            ..MessageRange::default()
        };
        let messages = log.query(CHANNEL, &range).await.unwrap();
        assert_eq!(
            messages.iter().map(|m| m.id.clone()).collect::<Vec<_>>(),
            vec![first.id, second.id, third.id]
        );
    }

    #[tokio::test]
    async fn test_dropped_message_never_appears_in_queries() {
        let log = log();
        let t = 1_700_000_000_000;
        for _ in 0..=DRIFT_TOLERANCE_MS {
            accepted(&log, t).await;
        }
        let outcome = log
            .post_at(CHANNEL, FROM, "chat", json!({}), None, at(t))
            .await
            .unwrap();
        assert_eq!(outcome, PostOutcome::Dropped);

        let wide = MessageRange {
            limit: Some(1000),
            ..MessageRange::default()
        };
        let messages = log.query(CHANNEL, &wide).await.unwrap();
        assert_eq!(messages.len() as i64, DRIFT_TOLERANCE_MS + 1);
    }

    #[tokio::test]
    async fn test_query_bounds_interchangeable_forms() {
        let log = log();
        let t = 1_700_000_000_000;
        let first = accepted(&log, t).await;
        let second = accepted(&log, t + 10).await;
        let third = accepted(&log, t + 20).await;

        // Full-identifier form.
        let by_id = log
            .query(
                CHANNEL,
                &MessageRange {
                    gt: Some(first.id.clone()),
                    ..MessageRange::default()
                },
            )
            .await
            .unwrap();
        // Timestamp-suffix form.
        let by_suffix = log
            .query(
                CHANNEL,
                &MessageRange {
                    gt: Some(format_timestamp(t)),
                    ..MessageRange::default()
                },
            )
            .await
            .unwrap();

        let ids: Vec<_> = by_id.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![second.id.clone(), third.id.clone()]);
        assert_eq!(by_id, by_suffix);
    }

    #[tokio::test]
    async fn test_query_limit_and_reverse() {
        let log = log();
        let t = 1_700_000_000_000;
        let mut ids = Vec::new();
        for i in 0..5i64 {
            ids.push(accepted(&log, t + i * 1000).await.id);
        }

        let newest_first = log
            .query(
                CHANNEL,
                &MessageRange {
                    limit: Some(2),
                    reverse: true,
                    ..MessageRange::default()
                },
            )
            .await
            .unwrap();
        let got: Vec<_> = newest_first.iter().map(|m| m.id.clone()).collect();
        ids.reverse();
        assert_eq!(got, ids.into_iter().take(2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_channel_yields_empty_vec() {
        let log = log();
        let messages = log.query("room.a_0_s_i", &MessageRange::default()).await.unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let log = log();
        let t = 1_700_000_000_000;
        accepted(&log, t).await;

        let other = log
            .query("room.priv_43_s1_i1", &MessageRange::default())
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
