//! Configuration types for the search daemon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GrandSearchError, Result};

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrandSearchConfig {
    /// Task execution settings.
    pub task: TaskSettings,
    /// File name search settings.
    pub file: FileSearchConfig,
    /// Paths excluded from every searcher.
    pub blacklist: BlacklistConfig,
    /// Application launcher search settings.
    pub applications: ApplicationSearchConfig,
    /// External command search settings.
    pub command: CommandSearchConfig,
    /// Logging settings.
    pub log: LogConfig,
}

/// Task execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// How many parallel-discipline searchers may run at once.
    pub max_parallel_workers: usize,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            max_parallel_workers: search_task::TaskConfig::default().max_parallel_workers,
        }
    }
}

impl TaskSettings {
    /// Convert to the orchestrator's configuration.
    pub fn to_task_config(&self) -> search_task::TaskConfig {
        search_task::TaskConfig {
            max_parallel_workers: self.max_parallel_workers,
        }
    }
}

/// File name search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSearchConfig {
    /// Whether the file name searcher runs.
    pub enabled: bool,
    /// Directories to search. Empty means the home directory.
    pub roots: Vec<PathBuf>,
    /// Maximum directory depth below each root (None = unlimited).
    pub max_depth: Option<usize>,
    /// Stop after this many matches.
    pub max_results: usize,
    /// Descend into hidden files and directories.
    pub include_hidden: bool,
    /// Matches buffered before they are handed to the task.
    pub batch_size: usize,
}

impl Default for FileSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            roots: Vec::new(),
            max_depth: Some(8),
            max_results: 200,
            include_hidden: false,
            batch_size: 20,
        }
    }
}

impl FileSearchConfig {
    /// Configured roots, falling back to the home directory.
    pub fn effective_roots(&self) -> Vec<PathBuf> {
        if !self.roots.is_empty() {
            return self.roots.clone();
        }
        dirs::home_dir().into_iter().collect()
    }
}

/// Paths whose contents never appear in results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistConfig {
    /// Excluded directories. Everything below them is skipped.
    pub paths: Vec<PathBuf>,
}

impl BlacklistConfig {
    /// Whether `path` is one of the excluded paths or lies below one.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|excluded| path.starts_with(excluded))
    }
}

/// A launchable application known to the application searcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationEntry {
    /// Display name matched against the query.
    pub name: String,
    /// Launch command.
    pub exec: String,
    /// Icon name.
    #[serde(default)]
    pub icon: String,
}

/// Application search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSearchConfig {
    /// Whether the application searcher runs.
    pub enabled: bool,
    /// Known applications.
    pub entries: Vec<ApplicationEntry>,
}

impl Default for ApplicationSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entries: Vec::new(),
        }
    }
}

/// External command search configuration.
///
/// The command runs on the sequential line because such tools usually share
/// a database or index that should not be hit concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSearchConfig {
    /// Whether the command searcher runs.
    pub enabled: bool,
    /// Program to execute.
    pub program: String,
    /// Arguments; `{query}` is replaced with the query text.
    pub args: Vec<String>,
    /// Group key for produced items.
    pub group: String,
}

impl Default for CommandSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "locate".into(),
            args: vec!["-i".into(), "-l".into(), "200".into(), "{query}".into()],
            group: "file".into(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// Directory for daily log files. None = stderr only.
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "grand_search=info,search_task=info".into(),
            directory: None,
        }
    }
}

impl GrandSearchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GrandSearchError::Config(e.to_string()))
    }

    /// Load the default config file, or defaults when it does not exist or
    /// cannot be parsed.
    pub fn load_or_default() -> Self {
        let path = Self::default_config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable config file");
                Self::default()
            }
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| GrandSearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/grand-search/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/grand-search-config"))
            .join("grand-search")
            .join("config.toml")
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        if self.task.max_parallel_workers == 0 {
            return Err(GrandSearchError::Config(
                "task.max_parallel_workers must be greater than 0".into(),
            ));
        }
        if self.file.batch_size == 0 {
            return Err(GrandSearchError::Config(
                "file.batch_size must be greater than 0".into(),
            ));
        }
        if self.file.max_results == 0 {
            return Err(GrandSearchError::Config(
                "file.max_results must be greater than 0".into(),
            ));
        }
        if self.command.enabled && self.command.program.trim().is_empty() {
            return Err(GrandSearchError::Config(
                "command.program must be set when the command searcher is enabled".into(),
            ));
        }
        if self.command.group.trim().is_empty() {
            return Err(GrandSearchError::Config("command.group must not be empty".into()));
        }
        if let Some(entry) = self.applications.entries.iter().find(|e| e.name.trim().is_empty()) {
            return Err(GrandSearchError::Config(format!(
                "application entry with exec `{}` has no name",
                entry.exec
            )));
        }
        Ok(())
    }
}
