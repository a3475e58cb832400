//! Subscription state with per-layer id sets.
//!
//! Every layer keeps its own ordered id set per entity type. Cross-layer
//! questions (is this id held anywhere else?) are answered by scanning the
//! current sets, never from a cached count.

mod id_set;
mod layers;

pub use id_set::IdSet;
pub use layers::{EntitySet, Layer, LayerMap};
