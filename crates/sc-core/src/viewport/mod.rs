use serde::{Deserialize, Serialize};

mod anchor;
mod model;
mod subscriber;

pub use anchor::AnchorId;
pub use model::ViewportModel;
pub use subscriber::{subscriber_from_fn, FnSubscriber, ModelSubscriber};

/// Construction-time settings of a [`ViewportModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Page widths retained on each side of the compound active range
    pub buffer_pages: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { buffer_pages: 1 }
    }
}
