//! Cumulative result store with an unread-delta buffer.
//!
//! Workers publish from whatever thread they run on. Both maps live behind a
//! single lock so that the merge into `results`, the merge into `buffer`, and
//! the empty/non-empty check around them form one critical section.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{is_empty_map, MatchedItemMap};

/// Append every group of `source` to `target`.
///
/// Groups missing from `target` are inserted whole; existing groups get
/// `source`'s items appended after their current items. Not idempotent:
/// merging the same source twice duplicates its items.
pub fn merge(target: &mut MatchedItemMap, source: MatchedItemMap) {
    for (key, mut items) in source {
        target.entry(key).or_default().append(&mut items);
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    results: MatchedItemMap,
    buffer: MatchedItemMap,
}

/// Results shared between worker threads and the consumer.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: RwLock<StoreInner>,
}

impl ResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a worker report into both the cumulative results and the buffer.
    ///
    /// Returns `true` only when this call moved the buffer from empty to
    /// non-empty; that edge is what the consumer is notified about.
    pub fn publish(&self, items: MatchedItemMap) -> bool {
        let mut inner = self.write();
        let was_empty = is_empty_map(&inner.buffer);

        merge(&mut inner.results, items.clone());
        merge(&mut inner.buffer, items);

        was_empty && !is_empty_map(&inner.buffer)
    }

    /// Snapshot of everything published so far.
    pub fn results(&self) -> MatchedItemMap {
        self.read().results.clone()
    }

    /// Take the buffered items, leaving the buffer empty.
    pub fn drain(&self) -> MatchedItemMap {
        std::mem::take(&mut self.write().buffer)
    }

    /// Whether the buffer holds no unread item.
    pub fn is_buffer_empty(&self) -> bool {
        is_empty_map(&self.read().buffer)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("result store lock poisoned; continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("result store lock poisoned; continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }
}
