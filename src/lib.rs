//! # Sublayer
//!
//! Layered subscription tracking that reports only the net change in global
//! subscription state.
//!
//! ## Core Concepts
//!
//! - **Layers**: Named partitions of subscription state (e.g. one per screen)
//! - **Entity types**: Categories of ids within a layer (e.g. a feed topic)
//! - **First-party delta**: Ids that became subscribed in no other layer, or
//!   are no longer subscribed in any layer
//! - **Events**: One [`ChangeEvent`] per operation, keyed by [`ChangeKind`]
//!
//! ## Example
//!
//! ```ignore
//! use sublayer::{ChangeKind, SubscribeOptions, SubscriptionTracker};
//!
//! let mut tracker = SubscriptionTracker::new();
//! tracker.on(ChangeKind::Subscribe, |e| {
//!     println!("now live: {:?}", e.subscribed);
//!     Ok(())
//! });
//!
//! tracker.subscribe("Order", ["A", "B"], SubscribeOptions::layer("grid"))?;
//! // "A" is already live through "grid", so only "C" is reported
//! tracker.subscribe("Order", ["A", "C"], SubscribeOptions::layer("chart"))?;
//! ```

pub mod error;
pub mod events;
pub mod shared;
pub mod state;
pub mod tracker;
pub mod types;

// Re-exports
pub use error::{HandlerError, ListenerDetached, Result, TrackerError};
pub use events::{ChangeFeed, ChangeFeedConfig, EventDispatcher, Listener, ListenerId};
pub use shared::SharedTracker;
pub use state::{EntitySet, IdSet, Layer, LayerMap};
pub use tracker::{SubscribeOptions, SubscriptionTracker, TrackerConfig};
pub use types::*;
