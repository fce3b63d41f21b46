//! Search through an external command, one result path per output line.
//!
//! Tools such as `locate` share an index, so this searcher takes the
//! sequential line. When started by a task it returns at once and streams the
//! command's output from its own thread, signalling `async_finished` when the
//! process has exited or was killed.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use search_task::{MatchedItem, MatchedItemMap, SearchWorker, WorkerNotifier};

use super::buffer::WorkerBuffer;
use crate::config::CommandSearchConfig;

/// Lines read between two `unearthed` signals.
const LINES_PER_BATCH: usize = 50;

const QUERY_PLACEHOLDER: &str = "{query}";

struct CommandShared {
    config: CommandSearchConfig,
    buffer: WorkerBuffer,
    child: Mutex<Option<Child>>,
    running: AtomicBool,
}

impl CommandShared {
    fn child(&self) -> MutexGuard<'_, Option<Child>> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn command_line(&self, query: &str) -> Command {
        let mut command = Command::new(&self.config.program);
        command
            .args(
                self.config
                    .args
                    .iter()
                    .map(|arg| arg.replace(QUERY_PLACEHOLDER, query)),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        command
    }

    /// Run the command to completion (or termination), buffering each line.
    fn produce(&self, query: &str, notifier: &WorkerNotifier) {
        self.run_command(query, notifier);
        self.running.store(false, Ordering::SeqCst);
    }

    fn run_command(&self, query: &str, notifier: &WorkerNotifier) {
        if self.buffer.is_terminated() {
            return;
        }
        let mut child = match self.command_line(query).spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(program = %self.config.program, error = %err, "failed to run search command");
                return;
            }
        };
        let Some(stdout) = child.stdout.take() else {
            tracing::warn!(program = %self.config.program, "search command has no stdout");
            kill_child(&mut child);
            reap_child(child, 0);
            return;
        };
        *self.child() = Some(child);
        // terminate() may have run before the child was visible to it.
        if self.buffer.is_terminated() {
            self.kill();
        }

        let mut found = 0usize;
        let mut unpublished = 0usize;
        for line in BufReader::new(stdout).lines() {
            if self.buffer.is_terminated() {
                break;
            }
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::debug!(error = %err, "stopped reading search command output");
                    break;
                }
            };
            let path = line.trim();
            if path.is_empty() {
                continue;
            }
            let name = Path::new(path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            let item = MatchedItem::new(path, name).with_searcher("command");
            self.buffer.push(&self.config.group, item);
            found += 1;
            unpublished += 1;
            if unpublished >= LINES_PER_BATCH {
                notifier.unearthed();
                unpublished = 0;
            }
        }
        if unpublished > 0 {
            notifier.unearthed();
        }

        let child = self.child().take();
        if let Some(mut child) = child {
            if self.buffer.is_terminated() {
                kill_child(&mut child);
            }
            reap_child(child, found);
        }
    }

    fn kill(&self) {
        if let Some(child) = self.child().as_mut() {
            kill_child(child);
        }
    }
}

/// Returns false when the signal could not be sent, usually because the
/// command already exited.
fn kill_child(child: &mut Child) -> bool {
    match child.kill() {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(error = %err, "search command already exited");
            false
        }
    }
}

fn reap_child(mut child: Child, found: usize) -> Option<ExitStatus> {
    match child.wait() {
        Ok(status) => {
            tracing::debug!(%status, found, "search command exited");
            Some(status)
        }
        Err(err) => {
            tracing::debug!(error = %err, "failed to reap search command");
            None
        }
    }
}

/// Runs a configured program and reports each output line as a match.
pub struct CommandSearcher {
    shared: Arc<CommandShared>,
    query: String,
}

impl CommandSearcher {
    pub fn new(config: CommandSearchConfig) -> Self {
        Self {
            shared: Arc::new(CommandShared {
                config,
                buffer: WorkerBuffer::new(),
                child: Mutex::new(None),
                running: AtomicBool::new(false),
            }),
            query: String::new(),
        }
    }
}

impl SearchWorker for CommandSearcher {
    fn name(&self) -> &str {
        "command"
    }

    fn is_async(&self) -> bool {
        true
    }

    fn set_context(&mut self, context: &str) {
        self.query = context.trim().to_string();
    }

    fn working(&self, task_id: Option<&str>, notifier: WorkerNotifier) -> bool {
        if self.query.is_empty() {
            return false;
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let Some(task_id) = task_id else {
            self.shared.produce(&self.query, &notifier);
            return false;
        };

        let shared = Arc::clone(&self.shared);
        let query = self.query.clone();
        let spawn_res = std::thread::Builder::new()
            .name(format!("command-search-{task_id}"))
            .spawn(move || {
                shared.produce(&query, &notifier);
                notifier.async_finished();
            });
        match spawn_res {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("failed to spawn command search thread: {err}");
                self.shared.running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    fn has_item(&self) -> bool {
        self.shared.buffer.has_item()
    }

    fn take_all(&self) -> MatchedItemMap {
        self.shared.buffer.take_all()
    }

    fn terminate(&self) {
        self.shared.buffer.terminate();
        self.shared.kill();
    }
}
