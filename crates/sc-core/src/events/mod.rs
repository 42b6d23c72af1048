use crate::data::SeriesId;
use crate::range::Range;
use crate::viewport::AnchorId;

/// Notification emitted by the viewport model.
///
/// Events are delivered in the order the mutations were applied; every
/// state transition produces its own event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// An anchor's active range changed
    RangeChanged { anchor: AnchorId, range: Range },

    /// The buffer window was recomputed and every series pruned to it
    BufferChanged { buffer: Range },

    /// A series was registered
    SeriesAdded(SeriesId),

    /// A series was unregistered and its data discarded
    SeriesRemoved(SeriesId),

    /// A series became visible
    SeriesEnabled(SeriesId),

    /// A series was hidden
    SeriesDisabled(SeriesId),

    /// New points landed inside the anchor's active range
    ActivePointsLoaded { anchor: AnchorId, series: SeriesId },

    /// No load is in flight for the series anymore
    LoadingEnded(SeriesId),

    /// The selected key changed
    SelectionChanged(Option<i64>),
}

impl ModelEvent {
    /// Series the event is about, if any.
    pub fn series(&self) -> Option<SeriesId> {
        match self {
            ModelEvent::SeriesAdded(id)
            | ModelEvent::SeriesRemoved(id)
            | ModelEvent::SeriesEnabled(id)
            | ModelEvent::SeriesDisabled(id)
            | ModelEvent::LoadingEnded(id) => Some(*id),
            ModelEvent::ActivePointsLoaded { series, .. } => Some(*series),
            _ => None,
        }
    }
}
