//! Per-channel message sequencing.
//!
//! Assigns each accepted message a millisecond timestamp that is strictly
//! greater than every previous assignment on the same channel, even when
//! posts land in the same clock tick. A channel that outruns the clock by
//! more than the drift tolerance has its excess messages dropped silently:
//! bounded memory and strict ordering are traded for completeness. This is
//! the documented backpressure valve, not a bug.
//!
//! The per-channel "last assigned" map is the one piece of mutable shared
//! state in the core; a single mutex around it is enough because the
//! critical section is a map lookup and an insert (distinct channels only
//! contend on the lock itself, never on an entry).

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Maximum allowed gap between an assigned logical timestamp and the wall
/// clock before a message is dropped.
pub const DRIFT_TOLERANCE_MS: i64 = 100;

/// Result of one sequencing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceDecision {
    /// Committed timestamp for the message identifier.
    Assigned { timestamp_ms: i64 },
    /// Channel is ahead of the clock by more than the tolerance.
    Dropped,
}

/// Assigns monotonic, collision-free identifier timestamps per channel.
#[derive(Debug, Default)]
pub struct MessageSequencer {
    /// channel id -> last assigned timestamp (ms).
    last_assigned: Mutex<HashMap<String, i64>>,
}

impl MessageSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence a post on `channel_id` against the current wall clock.
    pub fn assign(&self, channel_id: &str) -> SequenceDecision {
        self.assign_at(channel_id, Utc::now().timestamp_millis())
    }

    /// Sequence a post at an explicit clock reading (test seam).
    pub fn assign_at(&self, channel_id: &str, now_ms: i64) -> SequenceDecision {
        let mut last_assigned = self
            .last_assigned
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let candidate = match last_assigned.get(channel_id) {
            // Clock did not advance past the last assignment: take the
            // smallest representable step instead of the wall clock.
            Some(&last) if last >= now_ms => last + 1,
            _ => now_ms,
        };

        if candidate > now_ms + DRIFT_TOLERANCE_MS {
            return SequenceDecision::Dropped;
        }

        last_assigned.insert(channel_id.to_string(), candidate);
        SequenceDecision::Assigned {
            timestamp_ms: candidate,
        }
    }
}
