//! Error types shared by the cache core

use thiserror::Error;

/// Errors raised by the core data structures.
///
/// Everything except [`CacheError::CorruptTree`] signals invalid usage by the
/// caller and is returned straight to the immediate caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("series {series} is not registered (registered: [{}])", registered.join(", "))]
    UnknownSeries {
        series: String,
        registered: Vec<String>,
    },

    #[error("series {0} is already registered")]
    DuplicateSeries(String),

    #[error("no selection is set")]
    NoSelection,

    #[error("step must be positive, got {0}")]
    InvalidStep(i64),

    #[error("tree invariant violated at key {key}: {reason}")]
    CorruptTree { key: i64, reason: String },
}

pub type Result<T> = std::result::Result<T, CacheError>;
