//! Coordinator configuration

use serde::{Deserialize, Serialize};

use crate::DataError;

/// Settings for a [`LoadCoordinator`](crate::LoadCoordinator)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of loader threads in the worker pool
    pub worker_threads: usize,

    /// Prefix for worker thread names
    pub thread_name: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            worker_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            thread_name: "sc-loader".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Config with a fixed pool size
    pub fn with_workers(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    /// Reject settings the coordinator cannot run with
    pub fn validate(&self) -> Result<(), DataError> {
        if self.worker_threads == 0 {
            return Err(DataError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.thread_name.trim().is_empty() {
            return Err(DataError::Config("thread_name must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.worker_threads >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let config = CoordinatorConfig::with_workers(0);
        assert!(matches!(config.validate(), Err(DataError::Config(_))));

        let config = CoordinatorConfig {
            thread_name: " ".to_string(),
            ..CoordinatorConfig::with_workers(2)
        };
        assert!(config.validate().is_err());
    }
}
