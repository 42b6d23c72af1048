//! Model changes the coordinator still has to react to

use ahash::AHashSet;
use parking_lot::Mutex;

use sc_core::{ModelEvent, ModelSubscriber, SeriesId};

/// Changes collected since the last scheduling pass
#[derive(Debug, Default)]
pub(crate) struct Pending {
    /// Some anchor moved, so the buffer window may have changed
    pub buffer_moved: bool,
    /// Series that need a pass regardless of the buffer
    pub series: AHashSet<SeriesId>,
    /// Series whose in-flight loads are no longer wanted
    pub removed: Vec<SeriesId>,
}

/// Subscriber that records model changes for the next scheduling pass
#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    inner: Mutex<Pending>,
}

impl PendingChanges {
    pub fn take(&self) -> Pending {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn mark_series(&self, ids: impl IntoIterator<Item = SeriesId>) {
        self.inner.lock().series.extend(ids);
    }
}

impl ModelSubscriber for PendingChanges {
    fn on_model_event(&self, event: &ModelEvent) {
        let mut pending = self.inner.lock();
        match event {
            ModelEvent::RangeChanged { .. } => pending.buffer_moved = true,
            ModelEvent::SeriesAdded(id) | ModelEvent::SeriesEnabled(id) => {
                pending.series.insert(*id);
            }
            ModelEvent::SeriesRemoved(id) => {
                pending.series.remove(id);
                pending.removed.push(*id);
            }
            _ => {}
        }
    }
}
