//! Event dispatch for subscription changes.
//!
//! - [`EventDispatcher`]: named handler lists with synchronous fan-out
//! - [`ChangeFeed`]: bounded channel listener for consumers that poll
//!
//! # Example
//!
//! ```ignore
//! let mut tracker = SubscriptionTracker::new();
//! let feed = tracker.open_feed(ChangeFeedConfig::default());
//!
//! tracker.subscribe("Order", ["A", "B"], SubscribeOptions::default())?;
//!
//! for event in feed.drain() {
//!     println!("{} {:?}", event.kind, event.subscribed);
//! }
//! ```

mod dispatcher;
mod feed;

pub use dispatcher::{EventDispatcher, Listener, ListenerId};
pub use feed::{ChangeFeed, ChangeFeedConfig};
