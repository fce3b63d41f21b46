//! Pending-match buffer shared by the built-in searchers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use search_task::{MatchedItem, MatchedItemMap, is_empty_map};

/// Matches produced but not yet taken by the task, plus the termination flag.
#[derive(Debug, Default)]
pub struct WorkerBuffer {
    pending: Mutex<MatchedItemMap>,
    terminated: AtomicBool,
}

impl WorkerBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one match to `group`.
    pub fn push(&self, group: &str, item: MatchedItem) {
        self.lock().entry(group.to_string()).or_default().push(item);
    }

    pub fn has_item(&self) -> bool {
        !is_empty_map(&self.lock())
    }

    pub fn take_all(&self) -> MatchedItemMap {
        std::mem::take(&mut *self.lock())
    }

    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MatchedItemMap> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
