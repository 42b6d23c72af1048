//! Load coordinator implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use sc_core::{
    CoverageTracker, DataSource, LoadHandle, LoadReport, LoadStatus, Range, SeriesId,
    ViewportModel,
};

use super::pending::PendingChanges;
use crate::{CoordinatorConfig, DataError};

/// One dispatched request that has not reported back yet
#[derive(Debug)]
struct InFlight {
    task: u64,
    range: Range,
    cancelled: Arc<AtomicBool>,
}

/// A finished request on its way back to the model thread
struct Completed {
    task: u64,
    series: SeriesId,
    report: LoadReport,
}

/// Keeps every enabled series of a [`ViewportModel`] loaded across its
/// buffer window.
///
/// Loader calls run on an owned worker pool. Their results are queued and
/// only applied to the model from [`poll`](Self::poll),
/// [`run_until_idle`](Self::run_until_idle) or
/// [`next_result`](Self::next_result), which must be called on the thread
/// that owns the model. At most one request per series is in flight for any
/// given key.
pub struct LoadCoordinator {
    pool: ThreadPool,
    pending: Arc<PendingChanges>,
    sender: UnboundedSender<Completed>,
    receiver: UnboundedReceiver<Completed>,
    in_flight: AHashMap<SeriesId, Vec<InFlight>>,
    /// Series to look at again on the next pass
    rescan: AHashSet<SeriesId>,
    /// Buffer window seen by the last scheduling pass
    last_buffer: Range,
    next_task: u64,
}

impl LoadCoordinator {
    /// Create a coordinator and subscribe it to `model`.
    ///
    /// Series already registered get loaded on the first [`poll`](Self::poll).
    pub fn new(config: &CoordinatorConfig, model: &mut ViewportModel) -> Result<Self, DataError> {
        config.validate()?;
        let prefix = config.thread_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(move |idx| format!("{}-{}", prefix, idx))
            .build()?;

        let pending = Arc::new(PendingChanges::default());
        model.add_subscriber(pending.clone());
        pending.mark_series(model.series().map(|source| source.id()));

        let last_buffer = model.buffer_range();
        let (sender, receiver) = unbounded_channel();
        debug!("Load coordinator started with {} workers", config.worker_threads);
        Ok(Self {
            pool,
            pending,
            sender,
            receiver,
            in_flight: AHashMap::new(),
            rescan: AHashSet::new(),
            last_buffer,
            next_task: 0,
        })
    }

    /// Apply every finished load, then schedule whatever is still missing.
    /// Returns the number of results applied.
    pub fn poll(&mut self, model: &mut ViewportModel) -> Result<usize, DataError> {
        let mut applied = 0;
        while let Ok(done) = self.receiver.try_recv() {
            self.apply(model, done)?;
            applied += 1;
        }
        self.schedule(model)?;
        Ok(applied)
    }

    /// Block until no load is in flight, applying results as they arrive.
    ///
    /// Never returns while a loader holds on to its handle. Must not be
    /// called from inside an async runtime; use
    /// [`next_result`](Self::next_result) there.
    pub fn run_until_idle(&mut self, model: &mut ViewportModel) -> Result<(), DataError> {
        self.poll(model)?;
        while !self.is_idle() {
            let Some(done) = self.receiver.blocking_recv() else {
                break;
            };
            self.apply(model, done)?;
            self.poll(model)?;
        }
        Ok(())
    }

    /// Wait for the next finished load, apply it and reschedule.
    /// Returns `false` without waiting when nothing is in flight.
    pub async fn next_result(&mut self, model: &mut ViewportModel) -> Result<bool, DataError> {
        self.schedule(model)?;
        if self.in_flight.is_empty() {
            return Ok(false);
        }
        let Some(done) = self.receiver.recv().await else {
            return Ok(false);
        };
        self.apply(model, done)?;
        self.schedule(model)?;
        Ok(true)
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty() && self.rescan.is_empty()
    }

    /// Number of requests dispatched but not applied yet
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.values().map(Vec::len).sum()
    }

    /// Ranges currently being loaded for `id`, ascending
    pub fn in_flight_ranges(&self, id: SeriesId) -> Vec<Range> {
        let mut ranges: Vec<Range> = self
            .in_flight
            .get(&id)
            .into_iter()
            .flatten()
            .map(|task| task.range)
            .collect();
        ranges.sort_by_key(|range| range.start);
        ranges
    }

    fn schedule(&mut self, model: &mut ViewportModel) -> Result<(), DataError> {
        let pending = self.pending.take();
        for id in &pending.removed {
            self.cancel_where(|series, _| series == *id);
        }

        let buffer = model.buffer_range();
        let mut all = false;
        if pending.buffer_moved && buffer != self.last_buffer {
            self.cancel_where(|_, range| !range.overlaps(&buffer));
            if self.last_buffer.contains_range(&buffer) {
                trace!("Buffer {} lies inside {}, nothing to load", buffer, self.last_buffer);
            } else {
                debug!("Buffer grew from {} to {}", self.last_buffer, buffer);
                all = true;
            }
            self.last_buffer = buffer;
        }

        let mut wanted = pending.series;
        wanted.extend(self.rescan.drain());
        if !all && wanted.is_empty() {
            return Ok(());
        }

        let targets: Vec<SeriesId> = model
            .series()
            .map(|source| source.id())
            .filter(|id| all || wanted.contains(id))
            .collect();
        for id in targets {
            if model.is_enabled(id)? {
                self.dispatch_missing(model, id)?;
            }
        }
        Ok(())
    }

    /// Request every missing piece of the buffer for `id` that is inside the
    /// reported key bounds and not already being loaded.
    fn dispatch_missing(&mut self, model: &ViewportModel, id: SeriesId) -> Result<(), DataError> {
        let source = model.source(id)?.clone();
        let (min_key, max_key) = model.key_bounds(id)?;
        let bounds = Range::new(min_key.unwrap_or(i64::MIN), max_key.unwrap_or(i64::MAX));

        let mut busy = CoverageTracker::new();
        for task in self.in_flight.get(&id).into_iter().flatten() {
            busy.add(task.range);
        }

        for missing in model.missing_ranges(id)? {
            let clipped = missing.intersect(&bounds);
            if clipped.is_empty() {
                continue;
            }
            for piece in busy.get_missing(clipped) {
                self.dispatch(&source, piece);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, source: &Arc<DataSource>, range: Range) {
        self.next_task += 1;
        let task = self.next_task;
        let series = source.id();
        let cancelled = Arc::new(AtomicBool::new(false));
        let sender = self.sender.clone();
        let handle = LoadHandle::new(range, cancelled.clone(), move |report| {
            // the coordinator may already be gone
            let _ = sender.send(Completed { task, series, report });
        });

        self.in_flight
            .entry(series)
            .or_default()
            .push(InFlight { task, range, cancelled });
        debug!("Dispatching load #{} of '{}' for {}", task, source.legend(), range);

        let loader = source.loader().clone();
        self.pool.spawn(move || loader.load(range, handle));
    }

    fn cancel_where(&self, mut predicate: impl FnMut(SeriesId, &Range) -> bool) {
        for (series, tasks) in &self.in_flight {
            for task in tasks {
                if predicate(*series, &task.range) && !task.cancelled.swap(true, Ordering::AcqRel) {
                    debug!("Cancelling load #{} for {}", task.task, task.range);
                }
            }
        }
    }

    fn apply(&mut self, model: &mut ViewportModel, done: Completed) -> Result<(), DataError> {
        let Completed { task, series, report } = done;
        let remaining = match self.in_flight.get_mut(&series) {
            Some(tasks) => {
                tasks.retain(|t| t.task != task);
                tasks.len()
            }
            None => 0,
        };
        if remaining == 0 {
            self.in_flight.remove(&series);
        }

        if !model.contains_series(series) {
            debug!("Dropping load #{} of removed series {}", task, series);
            return Ok(());
        }
        model.record_key_bounds(series, report.min_key, report.max_key)?;

        match (&report.status, report.cancelled) {
            (LoadStatus::Completed, false) => {
                model.on_points_loaded(series, report.range, &report.points)?;
            }
            (_, true) => {
                debug!("Discarding cancelled load #{} for {}", task, report.range);
                if report.range.overlaps(&model.buffer_range()) {
                    self.rescan.insert(series);
                }
            }
            (LoadStatus::Failed(reason), false) => {
                warn!("Load #{} for {} failed: {}", task, report.range, reason);
            }
            (LoadStatus::Abandoned, false) => {
                warn!("Load #{} for {} was dropped without finishing", task, report.range);
            }
        }

        if remaining == 0 {
            model.notify_loading_ended(series)?;
        }
        Ok(())
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        self.cancel_where(|_, _| true);
    }
}
