//! Mutex-guarded tracker for multi-threaded hosts.

use crate::error::{HandlerError, Result};
use crate::events::{ChangeFeed, ChangeFeedConfig, Listener, ListenerId};
use crate::state::LayerMap;
use crate::tracker::{SubscribeOptions, SubscriptionTracker, TrackerConfig};
use crate::types::{ChangeEvent, ChangeKind, EntityIds, IdList, ResubscribeDelta, SubscribedItem};
use parking_lot::Mutex;

/// A [`SubscriptionTracker`] behind a single lock.
///
/// Every method holds the lock for its whole duration, including listener
/// dispatch, so the set mutation, the cross-layer scan and the notification
/// are atomic relative to other callers. Listeners must not call back into
/// the same `SharedTracker`; the lock is not reentrant.
pub struct SharedTracker {
    inner: Mutex<SubscriptionTracker>,
}

impl SharedTracker {
    pub fn new() -> Self {
        Self::from(SubscriptionTracker::new())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self::from(SubscriptionTracker::with_config(config))
    }

    pub fn subscribe(
        &self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<Vec<SubscribedItem>> {
        self.inner.lock().subscribe(entity, ids, options)
    }

    pub fn unsubscribe(
        &self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<Vec<SubscribedItem>> {
        self.inner.lock().unsubscribe(entity, ids, options)
    }

    pub fn resubscribe(
        &self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<ResubscribeDelta> {
        self.inner.lock().resubscribe(entity, ids, options)
    }

    pub fn get_all_subscribed(&self) -> Vec<EntityIds> {
        self.inner.lock().get_all_subscribed()
    }

    /// Copy of the current layer mapping.
    pub fn snapshot(&self) -> LayerMap {
        self.inner.lock().get_subscribed_layers().clone()
    }

    pub fn is_subscribed(&self, entity: &str, id: &str) -> bool {
        self.inner.lock().is_subscribed(entity, id)
    }

    pub fn add_listener(&self, kind: ChangeKind, handler: Listener<ChangeEvent>) -> ListenerId {
        self.inner.lock().add_listener(kind, handler)
    }

    pub fn on<F>(&self, kind: ChangeKind, handler: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.inner.lock().on(kind, handler)
    }

    pub fn remove_listener(&self, kind: ChangeKind, handler: &Listener<ChangeEvent>) -> bool {
        self.inner.lock().remove_listener(kind, handler)
    }

    pub fn remove_listener_by_id(&self, kind: ChangeKind, id: ListenerId) -> bool {
        self.inner.lock().remove_listener_by_id(kind, id)
    }

    pub fn remove_all_listeners(&self, kind: ChangeKind) {
        self.inner.lock().remove_all_listeners(kind);
    }

    pub fn open_feed(&self, config: ChangeFeedConfig) -> ChangeFeed {
        self.inner.lock().open_feed(config)
    }

    pub fn close_feed(&self, feed: &ChangeFeed) {
        self.inner.lock().close_feed(feed);
    }

    /// Run `f` with exclusive access to the tracker.
    pub fn with<R>(&self, f: impl FnOnce(&mut SubscriptionTracker) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    pub fn into_inner(self) -> SubscriptionTracker {
        self.inner.into_inner()
    }
}

impl From<SubscriptionTracker> for SharedTracker {
    fn from(tracker: SubscriptionTracker) -> Self {
        Self {
            inner: Mutex::new(tracker),
        }
    }
}

impl Default for SharedTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_layers_converge() {
        let shared = Arc::new(SharedTracker::new());
        let feed = shared.open_feed(ChangeFeedConfig::kinds([ChangeKind::Subscribe]));

        let handles: Vec<_> = (0..4)
            .map(|n| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    let layer = format!("worker-{n}");
                    shared
                        .subscribe("Order", ["A", "B"], SubscribeOptions::layer(layer))
                        .unwrap()
                })
            })
            .collect();

        let total_first_party: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap().len())
            .sum();

        // Exactly one worker observes each id as globally new
        assert_eq!(total_first_party, 2);
        assert_eq!(shared.snapshot().layer_count(), 4);

        let announced: usize = feed.drain().iter().map(|e| e.subscribed.len()).sum();
        assert_eq!(announced, 2);
    }

    #[test]
    fn test_with_gives_exclusive_access() {
        let shared = SharedTracker::new();
        shared
            .subscribe("Order", "A", SubscribeOptions::default())
            .unwrap();

        let ids = shared.with(|tracker| tracker.layer_ids("default", "Order"));
        assert_eq!(ids, vec!["A"]);

        let tracker = shared.into_inner();
        assert!(tracker.is_subscribed("Order", "A"));
    }

    #[test]
    fn test_listener_surface_forwards() {
        let shared = SharedTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Listener<ChangeEvent> =
            Arc::new(move |e: &ChangeEvent| -> std::result::Result<(), HandlerError> {
                sink.lock().push(e.subscribed.clone());
                Ok(())
            });

        shared.add_listener(ChangeKind::Subscribe, Arc::clone(&handler));
        shared
            .subscribe("Order", "A", SubscribeOptions::default())
            .unwrap();

        assert!(shared.remove_listener(ChangeKind::Subscribe, &handler));
        assert!(!shared.remove_listener(ChangeKind::Subscribe, &handler));
        shared
            .subscribe("Order", "B", SubscribeOptions::default())
            .unwrap();

        assert_eq!(*seen.lock(), vec![vec!["A".to_string()]]);
    }
}
