//! The search task: owns a query's workers and results and drives both
//! execution lines to a single completion.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────┐ start ┌─────────┐ lines done + nothing executing ┌──────────┐
//! │ Idle ├──────►│ Running ├───────────────────────────────►│ Finished │
//! └──────┘       └────┬────┘                                └──────────┘
//!                     │ stop
//!                     ▼
//!                ┌──────────┐
//!                │ Canceled │
//!                └──────────┘
//! ```
//!
//! Destruction is orthogonal: requesting it while a line is still running
//! only sets a flag, and the task is destroyed by whichever completion
//! signal finds both lines done. Every completion source (either line, any
//! asynchronous worker) goes through the same evaluation, so the order in
//! which they arrive does not matter.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::event::{TaskEvent, TaskEvents};
use crate::line::{self, Line, LineState};
use crate::registry::WorkerRegistry;
use crate::store::ResultStore;
use crate::types::{item_count, MatchedItemMap};
use crate::worker::{SearchWorker, WorkerId, WorkerNotifier};

/// Last issued task id, so ids stay unique within the process even when two
/// tasks are created in the same millisecond.
static LAST_TASK_ID: AtomicI64 = AtomicI64::new(0);

fn next_task_id() -> String {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_TASK_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_TASK_ID.compare_exchange_weak(last, candidate, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// Where a task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Created; workers may join.
    Idle,
    /// Started; at least one line or asynchronous worker is outstanding.
    Running,
    /// Every worker completed and `Finished` was reported.
    Finished,
    /// Stopped by the consumer.
    Canceled,
    /// Workers released and event stream closed.
    Destroyed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Canceled => "canceled",
            Self::Destroyed => "destroyed",
        })
    }
}

/// Outcome of [`TaskCommander::delete_self`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destruction {
    /// Both lines were already done; the task is destroyed.
    Immediate,
    /// A line is still running; the task is destroyed when it completes.
    Deferred,
}

/// Mutable task state, guarded by one mutex.
struct Lifecycle {
    state: TaskState,
    content: String,
    registry: WorkerRegistry,
    sequential: LineState,
    parallel: LineState,
    pending_destruction: bool,
    finished: bool,
}

impl Lifecycle {
    fn lines_done(&self) -> bool {
        self.sequential.is_done() && self.parallel.is_done()
    }
}

/// State shared between the task handle, its execution lines, and worker
/// notifiers.
pub(crate) struct TaskShared {
    id: String,
    store: ResultStore,
    lifecycle: Mutex<Lifecycle>,
    working: AtomicBool,
    cancel: CancellationToken,
    events: Mutex<Option<UnboundedSender<TaskEvent>>>,
}

impl TaskShared {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Cleared by `stop`; the sequential line checks it before each worker.
    pub(crate) fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn notifier(self: &Arc<Self>, worker: WorkerId) -> WorkerNotifier {
        WorkerNotifier::new(worker, Arc::downgrade(self))
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| {
            warn!(task_id = %self.id, "task lifecycle lock poisoned; continuing with inner state");
            PoisonError::into_inner(poisoned)
        })
    }

    fn emit(&self, event: TaskEvent) {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = events.as_ref() {
            if tx.send(event).is_err() {
                tracing::trace!(task_id = %self.id, ?event, "event receiver dropped");
            }
        }
    }

    pub(crate) fn mark_executing(&self, worker: WorkerId) {
        self.lock().registry.mark_executing(worker);
    }

    pub(crate) fn unmark_executing(&self, worker: WorkerId) {
        self.lock().registry.unmark_executing(worker);
    }

    /// Pull a worker's buffered matches into the store.
    ///
    /// Runs on the worker's own thread.
    pub(crate) fn on_unearthed(&self, worker: WorkerId) {
        let found = self.lock().registry.get(worker).cloned();
        let Some(found) = found else {
            warn!(task_id = %self.id, %worker, "ignoring results from a worker this task does not own");
            return;
        };
        if !found.has_item() {
            return;
        }

        let items = found.take_all();
        tracing::trace!(
            task_id = %self.id,
            worker = found.name(),
            groups = items.len(),
            count = item_count(&items),
            "merging worker results"
        );
        if self.store.publish(items) {
            debug!(task_id = %self.id, "result buffer became non-empty");
            self.emit(TaskEvent::Matched);
        }
    }

    /// An asynchronous sequential worker reported completion.
    pub(crate) fn on_work_finished(&self, worker: WorkerId) {
        let mut life = self.lock();
        if !life.registry.unmark_executing(worker) {
            warn!(task_id = %self.id, %worker, "ignoring completion from a worker that is not executing");
            return;
        }
        debug!(
            task_id = %self.id,
            %worker,
            remaining = life.registry.executing_len(),
            "asynchronous worker finished"
        );
        let released = self.evaluate_completion(&mut life);
        drop(life);
        drop(released);
    }

    pub(crate) fn on_line_finished(&self, line: Line) {
        let mut life = self.lock();
        match line {
            Line::Sequential => life.sequential = LineState::Finished,
            Line::Parallel => life.parallel = LineState::Finished,
        }
        debug!(
            task_id = %self.id,
            %line,
            executing = life.registry.executing_len(),
            finished = life.finished,
            "execution line finished"
        );
        let released = self.evaluate_completion(&mut life);
        drop(life);
        drop(released);
    }

    /// Returns the workers released by a completed destruction.
    #[must_use]
    fn evaluate_completion(&self, life: &mut Lifecycle) -> Option<WorkerRegistry> {
        if !life.lines_done() {
            return None;
        }
        if life.pending_destruction {
            debug!(task_id = %self.id, "lines done, completing deferred destruction");
            return self.destroy(life);
        }
        if life.registry.executing_len() == 0 && !life.finished {
            life.finished = true;
            life.state = TaskState::Finished;
            info!(task_id = %self.id, "all workers completed, task finished");
            self.emit(TaskEvent::Finished);
        }
        None
    }

    /// Mark the task destroyed and hand back its workers.
    ///
    /// The caller drops the returned registry after releasing the lifecycle
    /// lock: a worker's `Drop` may still signal this task through its
    /// notifier.
    #[must_use]
    fn destroy(&self, life: &mut Lifecycle) -> Option<WorkerRegistry> {
        if life.state == TaskState::Destroyed {
            return None;
        }
        life.state = TaskState::Destroyed;
        life.pending_destruction = false;
        let released = life.registry.release();
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(task_id = %self.id, workers = released.len(), "task destroyed");
        Some(released)
    }
}

/// A search task for one query.
///
/// Join workers, take the event stream, then [`start`](Self::start). Drain
/// partial results with [`read_buffer`](Self::read_buffer) whenever a
/// [`TaskEvent::Matched`] arrives.
pub struct TaskCommander {
    shared: Arc<TaskShared>,
    config: TaskConfig,
    events: Mutex<Option<TaskEvents>>,
}

impl TaskCommander {
    /// Create an idle task for `content` with the default configuration.
    pub fn new(content: impl Into<String>) -> Self {
        Self::build(content.into(), TaskConfig::default())
    }

    /// Create an idle task with a custom configuration.
    pub fn with_config(content: impl Into<String>, config: TaskConfig) -> Result<Self, TaskError> {
        config.validate()?;
        Ok(Self::build(content.into(), config))
    }

    fn build(content: String, config: TaskConfig) -> Self {
        let (tx, events) = TaskEvents::channel();
        let id = next_task_id();
        debug!(task_id = %id, content_len = content.len(), "task created");
        let shared = Arc::new(TaskShared {
            id,
            store: ResultStore::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: TaskState::Idle,
                content,
                registry: WorkerRegistry::default(),
                sequential: LineState::Idle,
                parallel: LineState::Idle,
                pending_destruction: false,
                finished: false,
            }),
            working: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            events: Mutex::new(Some(tx)),
        });
        Self {
            shared,
            config,
            events: Mutex::new(Some(events)),
        }
    }

    /// Unique id assigned at creation.
    pub fn task_id(&self) -> &str {
        self.shared.id()
    }

    /// The query text.
    pub fn content(&self) -> String {
        self.shared.lock().content.clone()
    }

    /// Replace the query text. Only allowed while idle; workers joined
    /// earlier keep the text they were given.
    pub fn set_content(&self, content: impl Into<String>) -> bool {
        let mut life = self.shared.lock();
        if life.state != TaskState::Idle {
            warn!(task_id = %self.shared.id, state = %life.state, "cannot change content of a started task");
            return false;
        }
        let content = content.into();
        debug!(
            task_id = %self.shared.id,
            old_len = life.content.len(),
            new_len = content.len(),
            "task content updated"
        );
        life.content = content;
        true
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn take_events(&self) -> Option<TaskEvents> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Hand a worker to this task.
    ///
    /// Fails without side effects once the task has left `Idle`.
    pub fn join(&self, mut worker: Box<dyn SearchWorker>) -> bool {
        let mut life = self.shared.lock();
        if life.state != TaskState::Idle {
            warn!(task_id = %self.shared.id, state = %life.state, "cannot join worker, task already started");
            return false;
        }

        worker.set_context(&life.content);
        let name = worker.name().to_owned();
        let is_async = worker.is_async();
        let id = life.registry.insert(Arc::from(worker));
        debug!(
            task_id = %self.shared.id,
            worker = %name,
            %id,
            is_async,
            total = life.registry.len(),
            "worker joined"
        );
        true
    }

    /// Launch both execution lines.
    ///
    /// Returns false only when the task is not idle. Parallel workers run on
    /// the caller's tokio runtime, or on a crate-owned one when called from
    /// outside any runtime. With no workers at all the task finishes at once
    /// and `Finished` is queued for the consumer.
    pub fn start(&self) -> bool {
        let mut life = self.shared.lock();
        info!(
            task_id = %self.shared.id,
            state = %life.state,
            sequential = life.registry.sequential_len(),
            parallel = life.registry.parallel_len(),
            "starting task"
        );
        if life.state != TaskState::Idle {
            warn!(task_id = %self.shared.id, "task already started");
            return false;
        }

        let sequential = life.registry.sequential_workers();
        let parallel = life.registry.parallel_workers();

        life.state = TaskState::Running;
        self.shared.working.store(true, Ordering::SeqCst);

        if sequential.is_empty() && parallel.is_empty() {
            warn!(task_id = %self.shared.id, "no workers joined, finishing immediately");
            self.shared.working.store(false, Ordering::SeqCst);
            life.state = TaskState::Finished;
            life.finished = true;
            self.shared.emit(TaskEvent::Finished);
            return true;
        }

        if !sequential.is_empty() {
            life.sequential = LineState::Running;
        }
        if !parallel.is_empty() {
            life.parallel = LineState::Running;
        }
        drop(life);

        if !sequential.is_empty() {
            if let Err(err) = line::spawn_sequential(Arc::clone(&self.shared), sequential) {
                tracing::error!(task_id = %self.shared.id, error = %err, "sequential line failed to launch");
                self.shared.on_line_finished(Line::Sequential);
            }
        }
        if parallel.is_empty() {
            return true;
        }
        match line::runtime_handle() {
            Ok(handle) => line::spawn_parallel(
                &handle,
                Arc::clone(&self.shared),
                parallel,
                self.config.max_parallel_workers,
            ),
            Err(err) => {
                tracing::error!(task_id = %self.shared.id, error = %err, "parallel line failed to launch");
                self.shared.on_line_finished(Line::Parallel);
            }
        }
        true
    }

    /// Cancel the task.
    ///
    /// No further sequential worker is started, undispatched parallel
    /// workers are skipped and every worker is asked to terminate. The task
    /// reports finished as soon as this returns, although workers that
    /// ignore the request may keep running and publishing.
    pub fn stop(&self) {
        debug!(task_id = %self.shared.id, "stopping task");
        self.shared.working.store(false, Ordering::SeqCst);
        self.shared.cancel.cancel();

        let workers: Vec<Arc<dyn SearchWorker>> = self.shared.lock().registry.all().cloned().collect();
        for worker in &workers {
            worker.terminate();
        }
        debug!(task_id = %self.shared.id, count = workers.len(), "terminate requested from all workers");

        let mut life = self.shared.lock();
        if matches!(life.state, TaskState::Idle | TaskState::Running) {
            life.state = TaskState::Canceled;
        }
        life.finished = true;
    }

    /// Snapshot of every result merged so far.
    pub fn results(&self) -> MatchedItemMap {
        self.shared.store.results()
    }

    /// Take the results merged since the previous call.
    pub fn read_buffer(&self) -> MatchedItemMap {
        self.shared.store.drain()
    }

    /// Whether there are no unread results.
    pub fn is_empty_buffer(&self) -> bool {
        self.shared.store.is_buffer_empty()
    }

    /// True once the task finished or was stopped.
    pub fn is_finished(&self) -> bool {
        self.shared.lock().finished
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.shared.lock().state
    }

    /// True once the task released its workers.
    pub fn is_destroyed(&self) -> bool {
        self.state() == TaskState::Destroyed
    }

    /// True between a deferred [`delete_self`](Self::delete_self) and the
    /// destruction it waits for.
    pub fn is_destruction_pending(&self) -> bool {
        self.shared.lock().pending_destruction
    }

    /// Number of joined workers.
    pub fn worker_count(&self) -> usize {
        self.shared.lock().registry.len()
    }

    /// Release this task's workers and close its event stream, now if both
    /// lines are done, otherwise as soon as they are.
    ///
    /// A destroyed task never reports `Finished`.
    pub fn delete_self(&self) -> Destruction {
        let mut life = self.shared.lock();
        debug!(
            task_id = %self.shared.id,
            sequential_done = life.sequential.is_done(),
            parallel_done = life.parallel.is_done(),
            "destruction requested"
        );
        if life.lines_done() {
            let released = self.shared.destroy(&mut life);
            drop(life);
            drop(released);
            Destruction::Immediate
        } else {
            life.pending_destruction = true;
            Destruction::Deferred
        }
    }
}

impl fmt::Debug for TaskCommander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskCommander")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish()
    }
}
