//! Tracing setup for the daemon and its command-line front end.
//!
//! Diagnostics always go to stderr, so stdout stays free for results. When a
//! log directory is configured, a daily-rolling file receives the same
//! events through a non-blocking writer.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;
use crate::error::{GrandSearchError, Result};

/// File name prefix of rolling log files.
const LOG_FILE_PREFIX: &str = "grand-search.log";

/// Build the filter: `RUST_LOG` wins over the configured level.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match std::env::var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => Ok(EnvFilter::from_default_env()),
        _ => EnvFilter::try_new(&config.level)
            .map_err(|e| GrandSearchError::Config(format!("invalid log level `{}`: {e}", config.level))),
    }
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled; keep it
/// alive for as long as logs should be flushed. A second call leaves the
/// first subscriber in place.
///
/// # Errors
///
/// Returns an error if the filter is invalid or the log directory cannot be
/// created.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config)?;

    let mut guard = None;
    let file_layer = match config.directory.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(guard)
}
