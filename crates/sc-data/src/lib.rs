//! Loading and data sources for the series cache

pub mod config;
pub mod loading;
pub mod sources;

use sc_core::CacheError;
use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use config::CoordinatorConfig;
pub use loading::LoadCoordinator;
pub use sources::{CsvSource, FnLoader, MemorySource, SyntheticSource};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}
