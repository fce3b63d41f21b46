//! Error types for the search-task crate.
//!
//! Misuse of a task (joining after start, starting twice) is reported through
//! boolean returns and never surfaces here.

/// Errors raised while configuring or launching a search task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Invalid task configuration.
    #[error("config error: {0}")]
    Config(String),

    /// No async runtime is available to drive the parallel line.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// An execution line could not be launched.
    #[error("spawn error: {0}")]
    Spawn(String),
}

/// Convenience type alias for search-task results.
pub type Result<T> = std::result::Result<T, TaskError>;
