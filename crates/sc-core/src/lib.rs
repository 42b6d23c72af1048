//! Core data structures for the windowed series cache
//!
//! This crate provides the ordered point store, the coverage tracker and the
//! viewport model that keeps both trimmed to what the viewers need. Loading
//! itself is coordinated by `sc-data`.

pub mod coverage;
pub mod data;
pub mod error;
pub mod events;
pub mod range;
pub mod store;
pub mod viewport;

// Re-export commonly used types
pub use coverage::CoverageTracker;
pub use data::{DataSource, LoadHandle, LoadReport, LoadStatus, Rgba, SeriesId, SeriesLoader};
pub use error::{CacheError, Result};
pub use events::ModelEvent;
pub use range::{Range, Sample};
pub use store::OrderedStore;
pub use viewport::{
    subscriber_from_fn, AnchorId, ModelConfig, ModelSubscriber, ViewportModel,
};
