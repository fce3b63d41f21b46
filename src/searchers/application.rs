//! Application launcher search over configured entries.

use search_task::{MatchedItem, MatchedItemMap, SearchWorker, WorkerNotifier};

use super::buffer::WorkerBuffer;
use crate::config::ApplicationEntry;

pub const APPLICATION_GROUP: &str = "application";

/// Matches application names, case-insensitively.
pub struct ApplicationSearcher {
    entries: Vec<ApplicationEntry>,
    query: String,
    buffer: WorkerBuffer,
}

impl ApplicationSearcher {
    pub fn new(entries: Vec<ApplicationEntry>) -> Self {
        Self {
            entries,
            query: String::new(),
            buffer: WorkerBuffer::new(),
        }
    }
}

impl SearchWorker for ApplicationSearcher {
    fn name(&self) -> &str {
        "application"
    }

    fn is_async(&self) -> bool {
        false
    }

    fn set_context(&mut self, context: &str) {
        self.query = context.trim().to_lowercase();
    }

    fn working(&self, _task_id: Option<&str>, notifier: WorkerNotifier) -> bool {
        if self.query.is_empty() {
            return false;
        }
        let mut found = 0usize;
        for entry in &self.entries {
            if self.buffer.is_terminated() {
                break;
            }
            if !entry.name.to_lowercase().contains(&self.query) {
                continue;
            }
            let item = MatchedItem::new(&entry.exec, &entry.name)
                .with_icon(&entry.icon)
                .with_kind("application")
                .with_searcher(self.name())
                .with_extra("exec", &entry.exec);
            self.buffer.push(APPLICATION_GROUP, item);
            found += 1;
        }
        if found > 0 {
            notifier.unearthed();
        }
        tracing::debug!(found, "application search completed");
        false
    }

    fn has_item(&self) -> bool {
        self.buffer.has_item()
    }

    fn take_all(&self) -> MatchedItemMap {
        self.buffer.take_all()
    }

    fn terminate(&self) {
        self.buffer.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, exec: &str) -> ApplicationEntry {
        ApplicationEntry {
            name: name.into(),
            exec: exec.into(),
            icon: format!("{exec}-icon"),
        }
    }

    fn searcher(query: &str) -> ApplicationSearcher {
        let mut searcher = ApplicationSearcher::new(vec![
            entry("Text Editor", "gedit"),
            entry("Terminal", "x-terminal-emulator"),
            entry("Web Browser", "firefox"),
        ]);
        searcher.set_context(query);
        searcher
    }

    #[test]
    fn matches_by_name_substring() {
        let searcher = searcher("TE");
        assert!(!searcher.working(None, WorkerNotifier::detached()));

        let found = searcher.take_all();
        let apps = &found[APPLICATION_GROUP];
        let names: Vec<&str> = apps.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Text Editor", "Terminal"]);
        assert_eq!(apps[0].item, "gedit");
        assert_eq!(apps[0].icon, "gedit-icon");
        assert_eq!(apps[0].extra["exec"], "gedit");
        assert_eq!(apps[0].searcher, "application");
    }

    #[test]
    fn no_match_leaves_buffer_empty() {
        let searcher = searcher("spreadsheet");
        searcher.working(None, WorkerNotifier::detached());
        assert!(!searcher.has_item());
    }

    #[test]
    fn terminated_before_start_produces_nothing() {
        let searcher = searcher("t");
        searcher.terminate();
        searcher.working(None, WorkerNotifier::detached());
        assert!(!searcher.has_item());
    }
}
