//! Series identity and the loader capability
//!
//! Loaders live outside this crate (see `sc-data`); the model only needs
//! to know who a series is and how to hand a load request to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::range::{Range, Sample};

/// Series identifier type
pub type SeriesId = Uuid;

/// RGBA color
pub type Rgba = [u8; 4];

/// Something that can produce the samples of one series for a key range.
///
/// `load` may finish synchronously or move the handle to another thread,
/// but it must end the handle with [`LoadHandle::finish`] or
/// [`LoadHandle::fail`]. Dropping the handle counts as an abandoned load.
pub trait SeriesLoader: Send + Sync {
    fn load(&self, range: Range, handle: LoadHandle);
}

/// A named, colored, independently loadable series.
pub struct DataSource {
    id: SeriesId,
    legend: String,
    color: Rgba,
    loader: Arc<dyn SeriesLoader>,
}

impl DataSource {
    /// Create a data source with a fresh identity
    pub fn new(legend: impl Into<String>, color: Rgba, loader: Arc<dyn SeriesLoader>) -> Self {
        Self {
            id: Uuid::new_v4(),
            legend: legend.into(),
            color,
            loader,
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn legend(&self) -> &str {
        &self.legend
    }

    pub fn color(&self) -> Rgba {
        self.color
    }

    pub fn loader(&self) -> &Arc<dyn SeriesLoader> {
        &self.loader
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("id", &self.id)
            .field("legend", &self.legend)
            .field("color", &self.color)
            .finish_non_exhaustive()
    }
}

/// How a load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The loader called [`LoadHandle::finish`].
    Completed,
    /// The loader called [`LoadHandle::fail`].
    Failed(String),
    /// The handle was dropped without being ended.
    Abandoned,
}

/// Everything a loader produced for one request.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub range: Range,
    pub points: Vec<Sample>,
    pub min_key: Option<i64>,
    pub max_key: Option<i64>,
    pub status: LoadStatus,
    /// Whether the request had been cancelled when it ended.
    pub cancelled: bool,
}

type Completion = Box<dyn FnOnce(LoadReport) + Send>;

/// Accumulates the result of one load request.
pub struct LoadHandle {
    range: Range,
    points: Vec<Sample>,
    min_key: Option<i64>,
    max_key: Option<i64>,
    cancelled: Arc<AtomicBool>,
    completion: Option<Completion>,
}

impl LoadHandle {
    /// Create a handle that calls `completion` once when it ends.
    pub fn new(
        range: Range,
        cancelled: Arc<AtomicBool>,
        completion: impl FnOnce(LoadReport) + Send + 'static,
    ) -> Self {
        Self {
            range,
            points: Vec::new(),
            min_key: None,
            max_key: None,
            cancelled,
            completion: Some(Box::new(completion)),
        }
    }

    /// The requested range, inclusive.
    pub fn range(&self) -> Range {
        self.range
    }

    pub fn point_loaded(&mut self, x: i64, y: i64) {
        self.points.push(Sample::new(x, y));
    }

    /// Report the smallest key the series will ever have.
    pub fn report_min_key(&mut self, key: i64) {
        self.min_key = Some(key);
    }

    /// Report the largest key the series will ever have.
    pub fn report_max_key(&mut self, key: i64) {
        self.max_key = Some(key);
    }

    /// Long-running loaders should poll this and stop early when set.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Signal that loading ended normally.
    pub fn finish(mut self) {
        self.complete(LoadStatus::Completed);
    }

    /// Signal that loading failed. Accumulated points are discarded.
    pub fn fail(mut self, reason: impl Into<String>) {
        self.complete(LoadStatus::Failed(reason.into()));
    }

    fn complete(&mut self, status: LoadStatus) {
        let Some(completion) = self.completion.take() else {
            return;
        };
        let points = match status {
            LoadStatus::Completed => std::mem::take(&mut self.points),
            _ => Vec::new(),
        };
        completion(LoadReport {
            range: self.range,
            points,
            min_key: self.min_key,
            max_key: self.max_key,
            status,
            cancelled: self.is_cancelled(),
        });
    }
}

impl Drop for LoadHandle {
    fn drop(&mut self) {
        self.complete(LoadStatus::Abandoned);
    }
}

impl std::fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadHandle")
            .field("range", &self.range)
            .field("points", &self.points.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
