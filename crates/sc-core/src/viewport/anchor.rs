use serde::{Deserialize, Serialize};

/// Opaque token for one independent viewer of a model.
///
/// Minted by [`ViewportModel::anchor`](super::ViewportModel::anchor); a main
/// chart and its navigator each hold their own anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(u64);

impl AnchorId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}
