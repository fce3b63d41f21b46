//! Task configuration with sensible defaults.

use crate::error::TaskError;

/// Configuration for a single search task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    /// Upper bound on parallel-discipline workers running at the same time.
    pub max_parallel_workers: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_parallel_workers: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        }
    }
}

impl TaskConfig {
    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.max_parallel_workers == 0 {
            return Err(TaskError::Config(
                "max_parallel_workers must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TaskConfig::default();
        assert!(config.max_parallel_workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_parallel_workers_rejected() {
        let config = TaskConfig {
            max_parallel_workers: 0,
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_parallel_workers"));
    }
}
