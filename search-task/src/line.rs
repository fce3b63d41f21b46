//! The two execution lines a task drives its workers on.
//!
//! - The sequential line runs async-discipline workers one at a time, in join
//!   order, on a dedicated thread. It stops launching workers once the task
//!   is stopped. It is done when its loop exits, whether or not the workers
//!   it launched are still producing on their own threads.
//! - The parallel line dispatches sync-discipline workers onto the blocking
//!   pool, at most `max_workers` at once, and is done when every dispatched
//!   call has returned.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::error::TaskError;
use crate::task::TaskShared;
use crate::worker::{SearchWorker, WorkerId};

/// Progress of one execution line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineState {
    /// Never launched (no workers of this discipline).
    Idle,
    Running,
    Finished,
}

impl LineState {
    /// A line that never ran counts as done.
    pub(crate) fn is_done(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line {
    Sequential,
    Parallel,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        })
    }
}

type LineWorkers = Vec<(WorkerId, Arc<dyn SearchWorker>)>;

/// Threads of the runtime used when `start` is called outside any runtime.
const FALLBACK_RUNTIME_THREADS: usize = 1;

/// The caller's runtime, or a crate-owned one built on first use.
pub(crate) fn runtime_handle() -> Result<Handle, TaskError> {
    match Handle::try_current() {
        Ok(handle) => Ok(handle),
        Err(_) => fallback_runtime(),
    }
}

fn fallback_runtime() -> Result<Handle, TaskError> {
    static RUNTIME: OnceLock<std::io::Result<Runtime>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            debug!("no ambient tokio runtime, starting the search-task runtime");
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(FALLBACK_RUNTIME_THREADS)
                .thread_name("search-task-rt")
                .build()
        })
        .as_ref()
        .map(|runtime| runtime.handle().clone())
        .map_err(|err| TaskError::Runtime(err.to_string()))
}

/// Launch the sequential line on its own thread.
pub(crate) fn spawn_sequential(shared: Arc<TaskShared>, workers: LineWorkers) -> Result<(), TaskError> {
    std::thread::Builder::new()
        .name(format!("search-task-{}", shared.id()))
        .spawn(move || {
            run_sequential(&shared, workers);
            shared.on_line_finished(Line::Sequential);
        })
        .map(|_| ())
        .map_err(|err| TaskError::Spawn(err.to_string()))
}

fn run_sequential(shared: &Arc<TaskShared>, workers: LineWorkers) {
    let task_id = shared.id().to_owned();
    for (id, worker) in workers {
        if !shared.is_working() {
            debug!(task_id = %task_id, "task stopped, skipping remaining sequential workers");
            return;
        }

        // Tracked before the call so that a completion signalled from the
        // worker's own thread while `working` is still running is not lost.
        shared.mark_executing(id);
        let notifier = shared.notifier(id);
        let started = panic::catch_unwind(AssertUnwindSafe(|| worker.working(Some(&task_id), notifier)));
        match started {
            Ok(true) => {
                debug!(task_id = %task_id, worker = worker.name(), "worker continues asynchronously");
            }
            Ok(false) => {
                shared.unmark_executing(id);
                debug!(task_id = %task_id, worker = worker.name(), "worker completed synchronously");
            }
            Err(_) => {
                shared.unmark_executing(id);
                error!(task_id = %task_id, worker = worker.name(), "sequential worker panicked");
            }
        }
    }
}

/// Launch the parallel line as a task on `handle`.
pub(crate) fn spawn_parallel(
    handle: &Handle,
    shared: Arc<TaskShared>,
    workers: LineWorkers,
    max_workers: usize,
) {
    handle.spawn(async move {
        run_parallel(&shared, workers, max_workers).await;
        shared.on_line_finished(Line::Parallel);
    });
}

async fn run_parallel(shared: &Arc<TaskShared>, workers: LineWorkers, max_workers: usize) {
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let cancel = shared.cancel_token();
    let task_id = shared.id().to_owned();

    let calls = workers.into_iter().map(|(id, worker)| {
        let permits = Arc::clone(&permits);
        let cancel = cancel.clone();
        let notifier = shared.notifier(id);
        let task_id = task_id.clone();
        async move {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(task_id = %task_id, worker = worker.name(), "task stopped before worker was dispatched");
                    return;
                }
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let name = worker.name().to_owned();
            let call = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                worker.working(None, notifier)
            });
            match call.await {
                Ok(false) => debug!(task_id = %task_id, worker = %name, "parallel worker completed"),
                Ok(true) => {
                    warn!(task_id = %task_id, worker = %name, "sync worker reported asynchronous production; not tracked");
                }
                Err(err) => error!(task_id = %task_id, worker = %name, error = %err, "parallel worker failed"),
            }
        }
    });

    futures::future::join_all(calls).await;
}
