//! Ordered key-value store seam.
//!
//! The relay treats durable storage as an external collaborator with a
//! narrow contract: point put/delete/get plus a bounded range scan ordered
//! by key. [`MemoryStore`] is the in-process implementation; each relay
//! instance is authoritative for the channels it serves, so process-local
//! state is the documented deployment model (sharding channels across
//! instances, not replicating them).

use crate::errors::RelayError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

/// Upper-bound sentinel appended to a key prefix to cover every key under
/// that prefix. Matches the original wire sentinel (`\xFF\xFF\xFF\xFF`).
pub const HIGH_SENTINEL: &str = "\u{ff}\u{ff}\u{ff}\u{ff}";

/// Bounded range scan parameters.
///
/// `gt`/`gte` select the lower bound, `lt`/`lte` the upper bound. When both
/// the exclusive and inclusive variant of a bound are present the inclusive
/// one wins. Results are ordered by key, reversed when `reverse` is set,
/// and truncated to `limit` when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl RangeQuery {
    /// Unbounded scan of a whole table.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Scan of every key starting with `prefix`.
    #[must_use]
    pub fn prefix(prefix: &str) -> Self {
        Self {
            gte: Some(prefix.to_string()),
            lte: Some(format!("{prefix}{HIGH_SENTINEL}")),
            ..Self::default()
        }
    }
}

/// Ordered key-value range store contract.
///
/// Tables are independent key spaces; keys within a table are ordered
/// lexicographically (byte order of the UTF-8 encoding).
#[async_trait]
pub trait RangeStore: Send + Sync {
    /// Create or replace the value under `key`.
    async fn put(&self, table: &str, key: &str, value: Value) -> Result<(), RelayError>;

    /// Fetch the value under `key`, if any.
    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, RelayError>;

    /// Delete the value under `key`. Deleting a missing key is a no-op.
    async fn delete(&self, table: &str, key: &str) -> Result<(), RelayError>;

    /// Scan a key range ordered by key.
    async fn range(
        &self,
        table: &str,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Value)>, RelayError>;

    /// Delete every key matched by `query`, returning the number removed.
    ///
    /// Implemented as a scan plus point deletes, so it is safe to run
    /// concurrently with ongoing writes: a key created mid-clear may or
    /// may not survive, but no record is left half-deleted.
    async fn clear_range(&self, table: &str, query: &RangeQuery) -> Result<u64, RelayError>;
}

/// In-memory [`RangeStore`] backed by one `BTreeMap` per table.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Collect the keys of `map` within `query`'s bounds, in scan order.
fn scan_keys(map: &BTreeMap<String, Value>, query: &RangeQuery) -> Vec<String> {
    let lower: Bound<&str> = match (&query.gte, &query.gt) {
        (Some(gte), _) => Bound::Included(gte.as_str()),
        (None, Some(gt)) => Bound::Excluded(gt.as_str()),
        (None, None) => Bound::Unbounded,
    };
    let upper: Bound<&str> = match (&query.lte, &query.lt) {
        (Some(lte), _) => Bound::Included(lte.as_str()),
        (None, Some(lt)) => Bound::Excluded(lt.as_str()),
        (None, None) => Bound::Unbounded,
    };

    // BTreeMap::range panics on inverted bounds; an inverted caller-supplied
    // range is simply empty.
    if let (
        Bound::Included(lo) | Bound::Excluded(lo),
        Bound::Included(hi) | Bound::Excluded(hi),
    ) = (lower, upper)
    {
        if lo > hi {
            return Vec::new();
        }
        if lo == hi && !matches!((lower, upper), (Bound::Included(_), Bound::Included(_))) {
            return Vec::new();
        }
    }

    let mut keys: Vec<String> = map
        .range::<str, _>((lower, upper))
        .map(|(k, _)| k.clone())
        .collect();
    if query.reverse {
        keys.reverse();
    }
    if let Some(limit) = query.limit {
        keys.truncate(limit);
    }
    keys
}

#[async_trait]
impl RangeStore for MemoryStore {
    async fn put(&self, table: &str, key: &str, value: Value) -> Result<(), RelayError> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, table: &str, key: &str) -> Result<Option<Value>, RelayError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(key).cloned()))
    }

    async fn delete(&self, table: &str, key: &str) -> Result<(), RelayError> {
        let mut tables = self.tables.write().await;
        if let Some(t) = tables.get_mut(table) {
            t.remove(key);
        }
        Ok(())
    }

    async fn range(
        &self,
        table: &str,
        query: &RangeQuery,
    ) -> Result<Vec<(String, Value)>, RelayError> {
        let tables = self.tables.read().await;
        let Some(map) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let entries = scan_keys(map, query)
            .into_iter()
            .filter_map(|k| map.get(&k).cloned().map(|v| (k, v)))
            .collect();
        Ok(entries)
    }

    async fn clear_range(&self, table: &str, query: &RangeQuery) -> Result<u64, RelayError> {
        let mut tables = self.tables.write().await;
        let Some(map) = tables.get_mut(table) else {
            return Ok(0);
        };
        let keys = scan_keys(map, query);
        let mut removed = 0u64;
        for key in keys {
            if map.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
