//! Session-level orchestration: one live search task at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use search_task::{Destruction, SearchWorker, TaskCommander, TaskError, TaskEvents};

use crate::config::GrandSearchConfig;
use crate::error::{GrandSearchError, Result};
use crate::searchers::{ApplicationSearcher, CommandSearcher, FileNameSearcher};

/// Builds searchers from configuration and runs queries through them.
///
/// Starting a new search replaces the current task: the old one is stopped
/// and asked to destroy itself once its execution lines have wound down.
pub struct MainController {
    config: GrandSearchConfig,
    current: Mutex<Option<Arc<TaskCommander>>>,
}

impl MainController {
    /// Create a controller after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`GrandSearchError::Config`] when the configuration is invalid.
    pub fn new(config: GrandSearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            current: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GrandSearchConfig {
        &self.config
    }

    /// Fresh instances of every enabled searcher.
    pub fn create_workers(&self) -> Vec<Box<dyn SearchWorker>> {
        let mut workers: Vec<Box<dyn SearchWorker>> = Vec::new();
        if self.config.file.enabled {
            workers.push(Box::new(FileNameSearcher::new(
                self.config.file.clone(),
                self.config.blacklist.clone(),
            )));
        }
        if self.config.applications.enabled {
            workers.push(Box::new(ApplicationSearcher::new(
                self.config.applications.entries.clone(),
            )));
        }
        if self.config.command.enabled {
            workers.push(Box::new(CommandSearcher::new(self.config.command.clone())));
        }
        workers
    }

    /// Start a search for `query`, replacing any current task.
    ///
    /// Returns the new task together with its event stream.
    ///
    /// # Errors
    ///
    /// Fails when the query is blank or the task configuration is invalid.
    pub fn search(&self, query: &str) -> Result<(Arc<TaskCommander>, TaskEvents)> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GrandSearchError::Searcher("query is empty".into()));
        }
        self.terminate();

        let task = Arc::new(TaskCommander::with_config(
            query,
            self.config.task.to_task_config(),
        )?);
        for worker in self.create_workers() {
            task.join(worker);
        }
        let events = task
            .take_events()
            .ok_or_else(|| TaskError::Runtime("event stream already taken".into()))?;
        if !task.start() {
            task.delete_self();
            return Err(TaskError::Runtime(format!("task {} failed to start", task.task_id())).into());
        }
        tracing::info!(
            task_id = %task.task_id(),
            workers = task.worker_count(),
            "search started"
        );

        *self.lock() = Some(Arc::clone(&task));
        Ok((task, events))
    }

    /// The task started by the latest successful [`search`](Self::search).
    pub fn current_task(&self) -> Option<Arc<TaskCommander>> {
        self.lock().clone()
    }

    /// Stop the current task, if any, and request its destruction.
    pub fn terminate(&self) {
        let Some(task) = self.lock().take() else {
            return;
        };
        task.stop();
        match task.delete_self() {
            Destruction::Immediate => tracing::debug!(task_id = %task.task_id(), "previous task released"),
            Destruction::Deferred => {
                tracing::debug!(task_id = %task.task_id(), "previous task released once its workers return")
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<TaskCommander>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::config::ApplicationEntry;
    use search_task::TaskEvent;
    use std::time::{Duration, Instant};

    fn config_without_files() -> GrandSearchConfig {
        let mut config = GrandSearchConfig::default();
        config.file.enabled = false;
        config.applications.entries.push(ApplicationEntry {
            name: "Terminal".into(),
            exec: "x-terminal-emulator".into(),
            icon: String::new(),
        });
        config
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = GrandSearchConfig::default();
        config.file.batch_size = 0;
        assert!(matches!(MainController::new(config), Err(GrandSearchError::Config(_))));
    }

    #[test]
    fn create_workers_follows_enabled_flags() {
        let mut config = GrandSearchConfig::default();
        config.command.enabled = true;
        let controller = MainController::new(config).unwrap();
        let workers = controller.create_workers();
        let names: Vec<&str> = workers.iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["file", "application", "command"]);
        assert!(workers[2].is_async());

        let controller = MainController::new(config_without_files()).unwrap();
        let names: Vec<String> = controller
            .create_workers()
            .iter()
            .map(|w| w.name().to_string())
            .collect();
        assert_eq!(names, vec!["application"]);
    }

    #[test]
    fn blank_query_rejected() {
        let controller = MainController::new(config_without_files()).unwrap();
        assert!(matches!(controller.search("   "), Err(GrandSearchError::Searcher(_))));
        assert!(controller.current_task().is_none());
    }

    #[test]
    fn search_outside_runtime_still_finishes() {
        let controller = MainController::new(config_without_files()).unwrap();
        let (task, mut events) = controller.search("term").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut matched = false;
        loop {
            match events.try_recv() {
                Ok(TaskEvent::Matched) => matched = true,
                Ok(TaskEvent::Finished) => break,
                Err(_) => {
                    assert!(Instant::now() < deadline, "search never finished");
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
        assert!(matched);
        assert_eq!(task.results()["application"][0].name, "Terminal");
    }

    #[tokio::test]
    async fn search_keeps_current_task() {
        let controller = MainController::new(config_without_files()).unwrap();
        let (task, _events) = controller.search(" term ").unwrap();
        assert_eq!(task.content(), "term");
        let current = controller.current_task().unwrap();
        assert_eq!(current.task_id(), task.task_id());

        controller.terminate();
        assert!(controller.current_task().is_none());
        assert!(task.is_finished());
    }
}
