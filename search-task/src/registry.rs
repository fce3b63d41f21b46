//! The set of workers joined to a task, partitioned by discipline.

use std::collections::HashSet;
use std::sync::Arc;

use crate::worker::{SearchWorker, WorkerId};

/// Joined workers in insertion order.
///
/// `sequential` and `parallel` are disjoint and together cover every joined
/// worker. `executing` only ever holds sequential workers that reported
/// asynchronous production.
#[derive(Default)]
pub(crate) struct WorkerRegistry {
    workers: Vec<Arc<dyn SearchWorker>>,
    sequential: Vec<WorkerId>,
    parallel: Vec<WorkerId>,
    executing: HashSet<WorkerId>,
}

impl WorkerRegistry {
    /// Append a worker, partitioning it by its declared discipline.
    pub(crate) fn insert(&mut self, worker: Arc<dyn SearchWorker>) -> WorkerId {
        let id = WorkerId(self.workers.len());
        if worker.is_async() {
            self.sequential.push(id);
        } else {
            self.parallel.push(id);
        }
        self.workers.push(worker);
        id
    }

    pub(crate) fn get(&self, id: WorkerId) -> Option<&Arc<dyn SearchWorker>> {
        self.workers.get(id.0)
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &Arc<dyn SearchWorker>> {
        self.workers.iter()
    }

    pub(crate) fn sequential_len(&self) -> usize {
        self.sequential.len()
    }

    pub(crate) fn parallel_len(&self) -> usize {
        self.parallel.len()
    }

    /// Sequential workers with their ids, in join order.
    pub(crate) fn sequential_workers(&self) -> Vec<(WorkerId, Arc<dyn SearchWorker>)> {
        self.snapshot(&self.sequential)
    }

    pub(crate) fn parallel_workers(&self) -> Vec<(WorkerId, Arc<dyn SearchWorker>)> {
        self.snapshot(&self.parallel)
    }

    /// Track a sequential worker as producing asynchronously.
    ///
    /// Returns false for ids outside the sequential partition.
    pub(crate) fn mark_executing(&mut self, id: WorkerId) -> bool {
        if !self.sequential.contains(&id) {
            return false;
        }
        self.executing.insert(id);
        true
    }

    /// Stop tracking a worker. Returns false when it was not tracked.
    pub(crate) fn unmark_executing(&mut self, id: WorkerId) -> bool {
        self.executing.remove(&id)
    }

    pub(crate) fn executing_len(&self) -> usize {
        self.executing.len()
    }

    /// Hand over every worker this registry owns, leaving it empty.
    pub(crate) fn release(&mut self) -> WorkerRegistry {
        std::mem::take(self)
    }

    fn snapshot(&self, ids: &[WorkerId]) -> Vec<(WorkerId, Arc<dyn SearchWorker>)> {
        ids.iter()
            .filter_map(|id| self.get(*id).map(|worker| (*id, Arc::clone(worker))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MatchedItemMap;
    use crate::worker::WorkerNotifier;

    struct StubWorker {
        name: String,
        is_async: bool,
    }

    impl SearchWorker for StubWorker {
        fn name(&self) -> &str {
            &self.name
        }
        fn is_async(&self) -> bool {
            self.is_async
        }
        fn set_context(&mut self, _context: &str) {}
        fn working(&self, _task_id: Option<&str>, _notifier: WorkerNotifier) -> bool {
            false
        }
        fn has_item(&self) -> bool {
            false
        }
        fn take_all(&self) -> MatchedItemMap {
            MatchedItemMap::new()
        }
        fn terminate(&self) {}
    }

    fn stub(name: &str, is_async: bool) -> Arc<dyn SearchWorker> {
        Arc::new(StubWorker {
            name: name.to_string(),
            is_async,
        })
    }

    fn filled() -> WorkerRegistry {
        let mut registry = WorkerRegistry::default();
        for (name, is_async) in [("a", true), ("b", false), ("c", true), ("d", false), ("e", false)] {
            registry.insert(stub(name, is_async));
        }
        registry
    }

    #[test]
    fn partitions_are_disjoint_and_cover_all_workers() {
        let registry = filled();
        let sequential: HashSet<WorkerId> =
            registry.sequential_workers().into_iter().map(|(id, _)| id).collect();
        let parallel: HashSet<WorkerId> =
            registry.parallel_workers().into_iter().map(|(id, _)| id).collect();

        assert!(sequential.is_disjoint(&parallel));
        let union: HashSet<WorkerId> = sequential.union(&parallel).copied().collect();
        let all: HashSet<WorkerId> = (0..registry.len()).map(WorkerId).collect();
        assert_eq!(union, all);
    }

    #[test]
    fn partition_follows_declared_discipline_in_join_order() {
        let registry = filled();
        let sequential: Vec<String> = registry
            .sequential_workers()
            .iter()
            .map(|(_, w)| w.name().to_string())
            .collect();
        let parallel: Vec<String> = registry
            .parallel_workers()
            .iter()
            .map(|(_, w)| w.name().to_string())
            .collect();
        assert_eq!(sequential, vec!["a", "c"]);
        assert_eq!(parallel, vec!["b", "d", "e"]);
        assert_eq!(registry.sequential_len(), 2);
        assert_eq!(registry.parallel_len(), 3);
    }

    #[test]
    fn only_sequential_workers_can_be_executing() {
        let mut registry = filled();
        assert!(registry.mark_executing(WorkerId(0)));
        assert!(!registry.mark_executing(WorkerId(1)));
        assert!(!registry.mark_executing(WorkerId(42)));
        assert_eq!(registry.executing_len(), 1);

        assert!(registry.unmark_executing(WorkerId(0)));
        assert!(!registry.unmark_executing(WorkerId(0)));
        assert_eq!(registry.executing_len(), 0);
    }

    #[test]
    fn release_hands_over_workers() {
        let worker = stub("a", true);
        let mut registry = WorkerRegistry::default();
        registry.insert(Arc::clone(&worker));
        registry.mark_executing(WorkerId(0));
        assert_eq!(Arc::strong_count(&worker), 2);

        let released = registry.release();
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.executing_len(), 0);
        assert!(registry.get(WorkerId(0)).is_none());
        assert_eq!(Arc::strong_count(&worker), 2);

        drop(released);
        assert_eq!(Arc::strong_count(&worker), 1);
    }
}
