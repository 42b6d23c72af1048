//! Viewport model implementation

use std::sync::{Arc, Weak};

use ahash::AHashMap;
use indexmap::IndexMap;
use tracing::debug;

use super::{AnchorId, ModelConfig, ModelSubscriber};
use crate::coverage::CoverageTracker;
use crate::data::{DataSource, SeriesId};
use crate::error::{CacheError, Result};
use crate::events::ModelEvent;
use crate::range::{Range, Sample};
use crate::store::OrderedStore;

/// Per-series state owned by the model
struct SeriesState {
    source: Arc<DataSource>,
    points: OrderedStore<i64>,
    coverage: CoverageTracker,
    enabled: bool,
    min_key: Option<i64>,
    max_key: Option<i64>,
}

impl SeriesState {
    fn new(source: Arc<DataSource>) -> Self {
        Self {
            source,
            points: OrderedStore::new(),
            coverage: CoverageTracker::new(),
            enabled: true,
            min_key: None,
            max_key: None,
        }
    }
}

/// Shared cache behind one or more viewers.
///
/// Owns the points and coverage of every series and the active range of
/// every anchor, and keeps all of it trimmed to the buffer window derived
/// from the anchors. All methods must be called from one thread; loads
/// finishing elsewhere are handed back through
/// [`on_points_loaded`](Self::on_points_loaded).
pub struct ViewportModel {
    config: ModelConfig,
    series: IndexMap<SeriesId, SeriesState>,
    anchors: AHashMap<AnchorId, Range>,
    next_anchor: u64,
    /// Bounding union of all anchor ranges
    compound: Range,
    /// Compound range widened by the configured pages
    buffer: Range,
    selected_x: Option<i64>,
    subscribers: Vec<Weak<dyn ModelSubscriber>>,
}

impl ViewportModel {
    /// Create a new model
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            series: IndexMap::new(),
            anchors: AHashMap::new(),
            next_anchor: 0,
            compound: Range::EMPTY,
            buffer: Range::EMPTY,
            selected_x: None,
            subscribers: Vec::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Add a subscriber
    pub fn add_subscriber(&mut self, subscriber: Arc<dyn ModelSubscriber>) {
        self.subscribers.push(Arc::downgrade(&subscriber));
    }

    /// Mint a token for a new viewer. It has no active range until
    /// [`set_active_range`](Self::set_active_range) is called with it.
    pub fn anchor(&mut self) -> AnchorId {
        self.next_anchor += 1;
        AnchorId::new(self.next_anchor)
    }

    /// Register a series with empty points and coverage
    pub fn add_series(&mut self, source: Arc<DataSource>) -> Result<()> {
        let id = source.id();
        if self.series.contains_key(&id) {
            return Err(CacheError::DuplicateSeries(describe(&source)));
        }
        debug!("Adding series {}", describe(&source));
        self.series.insert(id, SeriesState::new(source));
        self.notify(ModelEvent::SeriesAdded(id));
        Ok(())
    }

    /// Unregister a series and discard everything loaded for it
    pub fn remove_series(&mut self, id: SeriesId) -> Result<Arc<DataSource>> {
        let Some(state) = self.series.shift_remove(&id) else {
            return Err(self.unknown(id));
        };
        debug!(
            "Removing series {} ({} points)",
            describe(&state.source),
            state.points.len()
        );
        self.notify(ModelEvent::SeriesRemoved(id));
        Ok(state.source)
    }

    pub fn contains_series(&self, id: SeriesId) -> bool {
        self.series.contains_key(&id)
    }

    /// Registered series in registration order
    pub fn series(&self) -> impl Iterator<Item = &Arc<DataSource>> + '_ {
        self.series.values().map(|state| &state.source)
    }

    pub fn source(&self, id: SeriesId) -> Result<&Arc<DataSource>> {
        self.state(id).map(|state| &state.source)
    }

    pub fn enable(&mut self, id: SeriesId) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&mut self, id: SeriesId) -> Result<()> {
        self.set_enabled(id, false)
    }

    pub fn is_enabled(&self, id: SeriesId) -> Result<bool> {
        self.state(id).map(|state| state.enabled)
    }

    fn set_enabled(&mut self, id: SeriesId, enabled: bool) -> Result<()> {
        let state = self.state_mut(id)?;
        if state.enabled == enabled {
            return Ok(());
        }
        state.enabled = enabled;
        self.notify(if enabled {
            ModelEvent::SeriesEnabled(id)
        } else {
            ModelEvent::SeriesDisabled(id)
        });
        Ok(())
    }

    /// Record the active range of `anchor`, registering the anchor on first
    /// use, and re-derive the buffer window. Setting the same range again
    /// is a no-op.
    pub fn set_active_range(&mut self, range: Range, anchor: AnchorId) {
        if self.anchors.get(&anchor) == Some(&range) {
            return;
        }
        self.anchors.insert(anchor, range);
        self.recompute_buffer();
        self.notify(ModelEvent::RangeChanged { anchor, range });
    }

    /// Forget an anchor, e.g. when its viewer is closed
    pub fn remove_anchor(&mut self, anchor: AnchorId) {
        if self.anchors.remove(&anchor).is_none() {
            return;
        }
        self.recompute_buffer();
        self.notify(ModelEvent::RangeChanged {
            anchor,
            range: Range::EMPTY,
        });
    }

    /// Active range of `anchor`, [`Range::EMPTY`] if it never set one
    pub fn active_range(&self, anchor: AnchorId) -> Range {
        self.anchors.get(&anchor).copied().unwrap_or(Range::EMPTY)
    }

    /// Bounding union of every anchor's active range
    pub fn compound_range(&self) -> Range {
        self.compound
    }

    /// Window of keys currently retained in memory
    pub fn buffer_range(&self) -> Range {
        self.buffer
    }

    fn recompute_buffer(&mut self) {
        let compound = self
            .anchors
            .values()
            .fold(Range::EMPTY, |acc, range| acc.span_union(range));
        if compound == self.compound {
            return;
        }
        self.compound = compound;

        let buffer = compound.expand_by_pages(self.config.buffer_pages);
        if buffer == self.buffer {
            return;
        }
        self.buffer = buffer;
        self.prune();
        self.notify(ModelEvent::BufferChanged { buffer });
    }

    /// Trim every series to the buffer window
    fn prune(&mut self) {
        let buffer = self.buffer;
        for state in self.series.values_mut() {
            state.coverage.keep_only(buffer);
            let removed = state.points.retain_range(buffer);
            if removed > 0 {
                debug!(
                    "Pruned {} points of {} outside {}",
                    removed,
                    state.source.legend(),
                    buffer
                );
            }
        }
    }

    /// Stored points of `id` inside the anchor's active range, ascending
    pub fn points_in_range(&self, id: SeriesId, anchor: AnchorId) -> Result<Vec<Sample>> {
        let state = self.state(id)?;
        Ok(state
            .points
            .range(self.active_range(anchor))
            .map(|(x, y)| Sample::new(x, y))
            .collect())
    }

    /// Closest stored point before the anchor's active range
    pub fn previous_point(&self, id: SeriesId, anchor: AnchorId) -> Result<Option<Sample>> {
        let state = self.state(id)?;
        let active = self.active_range(anchor);
        if active.is_empty() {
            return Ok(None);
        }
        Ok(state
            .points
            .previous_entry(active.start)
            .map(|(x, y)| Sample::new(x, y)))
    }

    /// Closest stored point after the anchor's active range
    pub fn next_point(&self, id: SeriesId, anchor: AnchorId) -> Result<Option<Sample>> {
        let state = self.state(id)?;
        let active = self.active_range(anchor);
        if active.is_empty() {
            return Ok(None);
        }
        Ok(state
            .points
            .next_entry(active.end)
            .map(|(x, y)| Sample::new(x, y)))
    }

    /// Whether the anchor's whole active range is covered for `id`
    pub fn is_fully_loaded(&self, id: SeriesId, anchor: AnchorId) -> Result<bool> {
        let state = self.state(id)?;
        Ok(state.coverage.contains(self.active_range(anchor)))
    }

    /// Parts of the buffer window not loaded yet for `id`
    pub fn missing_ranges(&self, id: SeriesId) -> Result<Vec<Range>> {
        Ok(self.state(id)?.coverage.get_missing(self.buffer))
    }

    /// Loaded ranges of `id`
    pub fn coverage(&self, id: SeriesId) -> Result<&[Range]> {
        Ok(self.state(id)?.coverage.ranges())
    }

    pub fn point_count(&self, id: SeriesId) -> Result<usize> {
        Ok(self.state(id)?.points.len())
    }

    /// Valid key bounds reported by the loader of `id`
    pub fn key_bounds(&self, id: SeriesId) -> Result<(Option<i64>, Option<i64>)> {
        let state = self.state(id)?;
        Ok((state.min_key, state.max_key))
    }

    /// Remember key bounds reported by a loader. `None` keeps the old value.
    pub fn record_key_bounds(
        &mut self,
        id: SeriesId,
        min_key: Option<i64>,
        max_key: Option<i64>,
    ) -> Result<()> {
        let state = self.state_mut(id)?;
        if min_key.is_some() {
            state.min_key = min_key;
        }
        if max_key.is_some() {
            state.max_key = max_key;
        }
        Ok(())
    }

    /// Apply the result of a completed load of `range`.
    ///
    /// Only points inside both `range` and the buffer window are kept, and
    /// only that intersection is recorded as covered. Every anchor whose
    /// active range received a point is notified.
    pub fn on_points_loaded(&mut self, id: SeriesId, range: Range, points: &[Sample]) -> Result<()> {
        let window = range.intersect(&self.buffer);
        let state = self.state_mut(id)?;
        if window.is_empty() {
            return Ok(());
        }

        let mut keys = Vec::with_capacity(points.len());
        for point in points.iter().filter(|point| window.contains(point.x)) {
            state.points.put(point.x, point.y);
            keys.push(point.x);
        }
        state.coverage.add(window);
        debug!(
            "Loaded {} points of {} in {}",
            keys.len(),
            state.source.legend(),
            window
        );

        keys.sort_unstable();
        let mut touched: Vec<AnchorId> = self
            .anchors
            .iter()
            .filter(|(_, active)| {
                let first = keys.partition_point(|x| *x < active.start);
                keys.get(first).is_some_and(|x| *x <= active.end)
            })
            .map(|(anchor, _)| *anchor)
            .collect();
        touched.sort_unstable();
        for anchor in touched {
            self.notify(ModelEvent::ActivePointsLoaded { anchor, series: id });
        }
        Ok(())
    }

    /// Announce that no load is in flight for `id` anymore
    pub fn notify_loading_ended(&mut self, id: SeriesId) -> Result<()> {
        self.state(id)?;
        self.notify(ModelEvent::LoadingEnded(id));
        Ok(())
    }

    /// Select a key. Re-selecting the current key does nothing.
    pub fn select(&mut self, x: i64) {
        self.set_selection(Some(x));
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(None);
    }

    pub fn has_selection(&self) -> bool {
        self.selected_x.is_some()
    }

    pub fn selected_x(&self) -> Result<i64> {
        self.selected_x.ok_or(CacheError::NoSelection)
    }

    fn set_selection(&mut self, selected: Option<i64>) {
        if self.selected_x == selected {
            return;
        }
        self.selected_x = selected;
        self.notify(ModelEvent::SelectionChanged(selected));
    }

    fn state(&self, id: SeriesId) -> Result<&SeriesState> {
        self.series.get(&id).ok_or_else(|| self.unknown(id))
    }

    fn state_mut(&mut self, id: SeriesId) -> Result<&mut SeriesState> {
        match self.series.get_index_of(&id) {
            Some(idx) => Ok(&mut self.series[idx]),
            None => Err(self.unknown(id)),
        }
    }

    fn unknown(&self, id: SeriesId) -> CacheError {
        CacheError::UnknownSeries {
            series: id.to_string(),
            registered: self.series.values().map(|state| describe(&state.source)).collect(),
        }
    }

    /// Notify all subscribers of a model change
    fn notify(&mut self, event: ModelEvent) {
        // Remove any dead weak references
        self.subscribers.retain(|weak| weak.strong_count() > 0);

        for weak in &self.subscribers {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_model_event(&event);
            }
        }
    }
}

impl Default for ViewportModel {
    fn default() -> Self {
        Self::new(ModelConfig::default())
    }
}

fn describe(source: &DataSource) -> String {
    format!("'{}' ({})", source.legend(), source.id())
}
