//! File and folder name search over configured roots.
//!
//! Runs on the parallel line: the walk blocks until it is done, handing
//! matches to the task every `batch_size` hits so results show up while the
//! walk is still going.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use search_task::{MatchedItem, MatchedItemMap, SearchWorker, WorkerNotifier};

use super::buffer::WorkerBuffer;
use crate::config::{BlacklistConfig, FileSearchConfig};

pub const FILE_GROUP: &str = "file";
pub const FOLDER_GROUP: &str = "folder";

/// Matches file and directory names against the query, case-insensitively.
pub struct FileNameSearcher {
    config: FileSearchConfig,
    roots: Vec<PathBuf>,
    blacklist: BlacklistConfig,
    query: String,
    buffer: WorkerBuffer,
}

impl FileNameSearcher {
    pub fn new(config: FileSearchConfig, blacklist: BlacklistConfig) -> Self {
        let roots = config.effective_roots();
        Self {
            config,
            roots,
            blacklist,
            query: String::new(),
            buffer: WorkerBuffer::new(),
        }
    }

    fn matches(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        name.to_lowercase().contains(&self.query).then_some(name)
    }

    fn walk_root(&self, root: &Path, found: &mut usize, notifier: &WorkerNotifier) -> bool {
        let blacklist = self.blacklist.clone();
        let walker = WalkBuilder::new(root)
            .hidden(!self.config.include_hidden)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .max_depth(self.config.max_depth)
            .filter_entry(move |entry| !blacklist.contains(entry.path()))
            .build();

        let mut unpublished = 0;
        for entry in walker {
            if self.buffer.is_terminated() {
                tracing::debug!(root = %root.display(), "file search terminated");
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::trace!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let path = entry.path();
            let Some(name) = self.matches(path) else {
                continue;
            };

            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let (group, kind) = if is_dir {
                (FOLDER_GROUP, "inode/directory")
            } else {
                (FILE_GROUP, "")
            };
            let item = MatchedItem::new(path.to_string_lossy(), name)
                .with_kind(kind)
                .with_searcher(self.name())
                .with_extra("depth", entry.depth().to_string());
            self.buffer.push(group, item);
            *found += 1;
            unpublished += 1;

            if unpublished >= self.config.batch_size {
                notifier.unearthed();
                unpublished = 0;
            }
            if *found >= self.config.max_results {
                tracing::debug!(found = *found, "file search reached result limit");
                if unpublished > 0 {
                    notifier.unearthed();
                }
                return false;
            }
        }
        if unpublished > 0 {
            notifier.unearthed();
        }
        !self.buffer.is_terminated()
    }
}

impl SearchWorker for FileNameSearcher {
    fn name(&self) -> &str {
        "file"
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
        let mut found = 0;
        for root in &self.roots {
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "skipping missing search root");
                continue;
            }
            if self.blacklist.contains(root) {
                continue;
            }
            if !self.walk_root(root, &mut found, &notifier) {
                break;
            }
        }
        tracing::debug!(found, "file search completed");
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
