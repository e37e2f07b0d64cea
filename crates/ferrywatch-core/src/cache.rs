// ── Cache collaborator ──
//
// The watch session only ever *invalidates*: it never reads or writes
// values. `Invalidator` is that one-operation seam. `QueryCache` is an
// in-memory store behind it with query-client semantics: invalidating a
// key marks it and every key it prefixes as stale.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::error::InvalidateError;
use crate::model::CacheKey;

const INVALIDATION_CHANNEL_CAPACITY: usize = 1024;

// ── Invalidator ─────────────────────────────────────────────────────

/// Marks cache entries stale. Must be callable from the session task
/// concurrently with reads elsewhere, without caller-side locking.
pub trait Invalidator: Send + Sync {
    fn invalidate(&self, key: &CacheKey) -> Result<(), InvalidateError>;
}

impl<T: Invalidator + ?Sized> Invalidator for Arc<T> {
    fn invalidate(&self, key: &CacheKey) -> Result<(), InvalidateError> {
        (**self).invalidate(key)
    }
}

/// Forward keys to a consumer task (fire-and-forget).
impl Invalidator for mpsc::UnboundedSender<CacheKey> {
    fn invalidate(&self, key: &CacheKey) -> Result<(), InvalidateError> {
        self.send(key.clone()).map_err(|_| InvalidateError::Closed)
    }
}

// ── QueryCache ──────────────────────────────────────────────────────

/// One cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<serde_json::Value>,
    pub stale: bool,
}

/// Lock-free query cache keyed by [`CacheKey`].
///
/// Uses `DashMap` for concurrent access; every invalidation is also
/// broadcast so views can refetch what they display.
pub struct QueryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    invalidated: broadcast::Sender<CacheKey>,
}

impl QueryCache {
    pub fn new() -> Self {
        let (invalidated, _) = broadcast::channel(INVALIDATION_CHANNEL_CAPACITY);
        Self {
            entries: DashMap::new(),
            invalidated,
        }
    }

    /// Store a fresh value, clearing any stale mark.
    pub fn insert(&self, key: CacheKey, value: serde_json::Value) {
        self.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                stale: false,
            },
        );
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    /// `Some(true)` if the entry exists and must be refetched.
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.entries.get(key).map(|r| r.stale)
    }

    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Mark `key` and every entry it prefixes stale. Returns how many entries changed.
    pub fn mark_stale(&self, key: &CacheKey) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(key) && !entry.stale {
                entry.stale = true;
                marked += 1;
            }
        }
        marked
    }

    /// Receive every key passed to [`Invalidator::invalidate`].
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.invalidated.subscribe()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Invalidator for QueryCache {
    fn invalidate(&self, key: &CacheKey) -> Result<(), InvalidateError> {
        if key.is_empty() {
            return Err(InvalidateError::Rejected {
                key: String::new(),
                reason: "empty key would invalidate the whole cache".into(),
            });
        }

        let marked = self.mark_stale(key);
        tracing::trace!(%key, marked, "invalidated");

        // No subscribers is fine: nothing is displaying this key.
        let _ = self.invalidated.send(key.clone());
        Ok(())
    }
}
