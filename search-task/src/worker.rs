//! Trait definition for pluggable search workers.
//!
//! A task owns its workers once they are joined and drives them on one of two
//! execution lines, chosen by [`SearchWorker::is_async`]:
//!
//! - **async discipline** (`true`): run one at a time, in join order, on the
//!   task's dedicated sequential thread. `working` receives the task id and
//!   may return `true` to say production continues on the worker's own
//!   thread; it must then call [`WorkerNotifier::async_finished`] when done,
//!   or the task never finishes.
//! - **sync discipline** (`false`): run concurrently on the blocking pool.
//!   `working` receives `None` and blocks until production is complete.

use std::fmt;
use std::sync::Weak;

use crate::task::TaskShared;
use crate::types::MatchedItemMap;

/// Position of a worker in its task's join order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub(crate) usize);

impl WorkerId {
    /// Zero-based join index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker#{}", self.0)
    }
}

/// A pluggable search source.
///
/// Implementations buffer their own matches: they call
/// [`WorkerNotifier::unearthed`] after adding items, and the task pulls them
/// out through [`has_item`](Self::has_item) and [`take_all`](Self::take_all)
/// on the same thread.
pub trait SearchWorker: Send + Sync {
    /// Short name used in logs and as the `searcher` of produced items.
    fn name(&self) -> &str;

    /// Discipline flag, fixed for the worker's lifetime.
    fn is_async(&self) -> bool;

    /// Receive the query text. Called once, when the worker joins a task.
    fn set_context(&mut self, context: &str);

    /// Begin producing matches.
    ///
    /// Returns `true` when production continues asynchronously after this
    /// call returns. Only meaningful when `task_id` is `Some`.
    fn working(&self, task_id: Option<&str>, notifier: WorkerNotifier) -> bool;

    /// Whether there are matches not yet taken.
    fn has_item(&self) -> bool;

    /// Take every buffered match.
    fn take_all(&self) -> MatchedItemMap;

    /// Cooperative request to stop producing. May be ignored.
    fn terminate(&self);
}

/// Callback handle a worker uses to signal its task.
///
/// Holds only a weak reference, so a worker keeping a notifier alive does not
/// keep its task alive. Signals sent after the task is gone are dropped.
#[derive(Clone)]
pub struct WorkerNotifier {
    worker: WorkerId,
    task: Weak<TaskShared>,
}

impl WorkerNotifier {
    pub(crate) fn new(worker: WorkerId, task: Weak<TaskShared>) -> Self {
        Self { worker, task }
    }

    /// A notifier bound to no task; every signal is a no-op.
    pub fn detached() -> Self {
        Self {
            worker: WorkerId(usize::MAX),
            task: Weak::new(),
        }
    }

    /// The worker this notifier speaks for.
    pub fn worker_id(&self) -> WorkerId {
        self.worker
    }

    /// New matches are buffered in the worker.
    ///
    /// The task takes and merges them synchronously, on the calling thread,
    /// before this returns.
    pub fn unearthed(&self) {
        if let Some(task) = self.task.upgrade() {
            task.on_unearthed(self.worker);
        }
    }

    /// Asynchronous production that began with `working` returning `true`
    /// has ended.
    pub fn async_finished(&self) {
        if let Some(task) = self.task.upgrade() {
            task.on_work_finished(self.worker);
        }
    }
}

impl fmt::Debug for WorkerNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerNotifier")
            .field("worker", &self.worker)
            .field("attached", &(self.task.strong_count() > 0))
            .finish()
    }
}
