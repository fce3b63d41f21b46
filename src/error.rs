//! Error types for the grand-search daemon.

/// Top-level error type for the search daemon.
#[derive(Debug, thiserror::Error)]
pub enum GrandSearchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search task error.
    #[error("task error: {0}")]
    Task(#[from] search_task::TaskError),

    /// A searcher could not be created or started.
    #[error("searcher error: {0}")]
    Searcher(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, GrandSearchError>;
