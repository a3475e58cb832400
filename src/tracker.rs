//! Subscription tracker computing net changes across layers.

use crate::error::{HandlerError, Result};
use crate::events::{ChangeFeed, ChangeFeedConfig, EventDispatcher, Listener, ListenerId};
use crate::state::{IdSet, LayerMap};
use crate::types::{
    ChangeEvent, ChangeKind, EntityIds, IdList, ResubscribeDelta, SubscribedItem, Trigger,
    DEFAULT_LAYER,
};
use std::sync::Arc;

/// Tracker configuration.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Layer used when [`SubscribeOptions::layer`] is not set.
    /// Default: "default"
    pub default_layer: String,

    /// Skip raising events whose `subscribed` and `unsubscribed` are both
    /// empty. Off by default, so every unsuppressed operation raises exactly
    /// one event.
    pub skip_empty_events: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_layer: DEFAULT_LAYER.to_string(),
            skip_empty_events: false,
        }
    }
}

/// Per-operation options.
#[derive(Clone, Debug, Default)]
pub struct SubscribeOptions {
    /// Target layer (None = [`TrackerConfig::default_layer`]).
    pub layer: Option<String>,

    /// Apply the change without raising an event.
    pub suppress_event: bool,
}

impl SubscribeOptions {
    /// Options targeting a specific layer.
    pub fn layer(name: impl Into<String>) -> Self {
        Self {
            layer: Some(name.into()),
            suppress_event: false,
        }
    }

    /// Same options with event raising turned off.
    pub fn suppressed(mut self) -> Self {
        self.suppress_event = true;
        self
    }
}

/// Tracks subscribed ids per layer and entity type.
///
/// Each mutating call updates one `(layer, entity)` set, then reports only
/// the ids whose global state changed: ids that no other layer already held
/// (for additions) or still holds (for removals). The state is mutated before
/// listeners run and is not rolled back if a listener fails.
pub struct SubscriptionTracker {
    config: TrackerConfig,
    layers: LayerMap,
    dispatcher: EventDispatcher<ChangeEvent>,
}

impl SubscriptionTracker {
    /// Create a tracker with the default configuration.
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            layers: LayerMap::new(),
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // --- Mutations ---

    /// Add `ids` to the `(layer, entity)` set.
    ///
    /// Returns the ids that became subscribed globally: newly added to this
    /// layer and not held by any other layer.
    pub fn subscribe(
        &mut self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<Vec<SubscribedItem>> {
        let layer = self.resolve_layer(&options);
        let ids: IdList = ids.into();
        let subscribed = self.add_ids(&layer, entity, ids.as_slice());

        if !options.suppress_event {
            self.raise(ChangeEvent {
                entity: entity.to_string(),
                subscribed: subscribed.clone(),
                unsubscribed: Vec::new(),
                kind: ChangeKind::Subscribe,
                trigger: Trigger {
                    layer,
                    action: ChangeKind::Subscribe,
                },
            })?;
        }

        Ok(subscribed)
    }

    /// Remove `ids` from the `(layer, entity)` set.
    ///
    /// Returns the ids that are no longer subscribed in any layer.
    pub fn unsubscribe(
        &mut self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<Vec<SubscribedItem>> {
        let layer = self.resolve_layer(&options);
        let ids: IdList = ids.into();
        let unsubscribed = self.remove_ids(&layer, entity, ids.as_slice());

        if !options.suppress_event {
            self.raise(ChangeEvent {
                entity: entity.to_string(),
                subscribed: Vec::new(),
                unsubscribed: unsubscribed.clone(),
                kind: ChangeKind::Unsubscribe,
                trigger: Trigger {
                    layer,
                    action: ChangeKind::Unsubscribe,
                },
            })?;
        }

        Ok(unsubscribed)
    }

    /// Replace the `(layer, entity)` set with exactly `ids`.
    ///
    /// Removals are applied before additions. A single `resubscribe` event
    /// carries both first-party deltas.
    pub fn resubscribe(
        &mut self,
        entity: &str,
        ids: impl Into<IdList>,
        options: SubscribeOptions,
    ) -> Result<ResubscribeDelta> {
        let layer = self.resolve_layer(&options);
        let ids: IdList = ids.into();
        let wanted = IdSet::from(ids.into_vec());
        let current = self.layers.get(&layer, entity).cloned().unwrap_or_default();

        let to_add: Vec<SubscribedItem> = wanted
            .iter()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        let to_remove: Vec<SubscribedItem> = current
            .iter()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();

        let unsubscribed = self.remove_ids(&layer, entity, &to_remove);
        let subscribed = self.add_ids(&layer, entity, &to_add);

        if !options.suppress_event {
            self.raise(ChangeEvent {
                entity: entity.to_string(),
                subscribed: subscribed.clone(),
                unsubscribed: unsubscribed.clone(),
                kind: ChangeKind::Resubscribe,
                trigger: Trigger {
                    layer,
                    action: ChangeKind::Resubscribe,
                },
            })?;
        }

        Ok(ResubscribeDelta {
            subscribed,
            unsubscribed,
        })
    }

    fn resolve_layer(&self, options: &SubscribeOptions) -> String {
        options
            .layer
            .clone()
            .unwrap_or_else(|| self.config.default_layer.clone())
    }

    /// Insert ids into one set and return the first-party additions.
    fn add_ids(&mut self, layer: &str, entity: &str, ids: &[SubscribedItem]) -> Vec<SubscribedItem> {
        let set = self.layers.entry_mut(layer, entity);
        let added: Vec<SubscribedItem> = ids.iter().filter(|id| set.insert(id)).cloned().collect();
        self.layers.prune(layer, entity);

        let first_party: Vec<SubscribedItem> = added
            .iter()
            .filter(|id| self.layers.is_exclusive_to(layer, entity, id))
            .cloned()
            .collect();

        tracing::debug!(
            layer,
            entity,
            requested = ids.len(),
            added = added.len(),
            first_party = first_party.len(),
            "subscribed ids"
        );

        first_party
    }

    /// Remove ids from one set and return the first-party removals.
    fn remove_ids(
        &mut self,
        layer: &str,
        entity: &str,
        ids: &[SubscribedItem],
    ) -> Vec<SubscribedItem> {
        let set = self.layers.entry_mut(layer, entity);
        let removed: Vec<SubscribedItem> = ids.iter().filter(|id| set.remove(id)).cloned().collect();
        self.layers.prune(layer, entity);

        let first_party: Vec<SubscribedItem> = removed
            .iter()
            .filter(|id| self.layers.is_exclusive_to(layer, entity, id))
            .cloned()
            .collect();

        tracing::debug!(
            layer,
            entity,
            requested = ids.len(),
            removed = removed.len(),
            first_party = first_party.len(),
            "unsubscribed ids"
        );

        first_party
    }

    fn raise(&mut self, event: ChangeEvent) -> Result<()> {
        if self.config.skip_empty_events && event.is_empty() {
            tracing::trace!(kind = %event.kind, entity = %event.entity, "skipping empty event");
            return Ok(());
        }
        self.dispatcher.trigger(event.kind.as_str(), &event)
    }

    // --- Queries ---

    /// Union of subscribed ids per entity type across all layers.
    pub fn get_all_subscribed(&self) -> Vec<EntityIds> {
        self.layers.union_by_entity()
    }

    /// Read-only view of the full layer mapping.
    pub fn get_subscribed_layers(&self) -> &LayerMap {
        &self.layers
    }

    /// Ids held by one layer for one entity type.
    pub fn layer_ids(&self, layer: &str, entity: &str) -> Vec<SubscribedItem> {
        self.layers.ids(layer, entity)
    }

    /// Whether any layer holds `id` for `entity`.
    pub fn is_subscribed(&self, entity: &str, id: &str) -> bool {
        self.layers.is_subscribed(entity, id)
    }

    // --- Listeners ---

    pub fn add_listener(&mut self, kind: ChangeKind, handler: Listener<ChangeEvent>) -> ListenerId {
        self.dispatcher.add_listener(kind.as_str(), handler)
    }

    /// Register a closure as a listener.
    pub fn on<F>(&mut self, kind: ChangeKind, handler: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.add_listener(kind, Arc::new(handler))
    }

    pub fn remove_listener(&mut self, kind: ChangeKind, handler: &Listener<ChangeEvent>) -> bool {
        self.dispatcher.remove_listener(kind.as_str(), handler)
    }

    pub fn remove_listener_by_id(&mut self, kind: ChangeKind, id: ListenerId) -> bool {
        self.dispatcher.remove_listener_by_id(kind.as_str(), id)
    }

    pub fn remove_all_listeners(&mut self, kind: ChangeKind) {
        self.dispatcher.remove_all_listeners(kind.as_str());
    }

    pub fn listener_count(&self, kind: ChangeKind) -> usize {
        self.dispatcher.listener_count(kind.as_str())
    }

    /// Open a buffered feed receiving the configured event kinds.
    ///
    /// Each kind is registered once, however often it is listed.
    pub fn open_feed(&mut self, config: ChangeFeedConfig) -> ChangeFeed {
        let (listener, receiver) = ChangeFeed::channel(config.buffer_size);
        let mut registrations: Vec<(ChangeKind, ListenerId)> = Vec::new();
        for kind in config.kinds {
            if registrations.iter().any(|(k, _)| *k == kind) {
                continue;
            }
            registrations.push((kind, self.add_listener(kind, Arc::clone(&listener))));
        }

        ChangeFeed::new(registrations, receiver)
    }

    /// Unregister a feed's listeners.
    pub fn close_feed(&mut self, feed: &ChangeFeed) {
        for (kind, id) in &feed.registrations {
            self.remove_listener_by_id(*kind, *id);
        }
    }
}

impl Default for SubscriptionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionTracker")
            .field("config", &self.config)
            .field("layers", &self.layers)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn capture(tracker: &mut SubscriptionTracker, kind: ChangeKind) -> Arc<Mutex<Vec<ChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        tracker.on(kind, move |e| {
            sink.lock().push(e.clone());
            Ok(())
        });
        events
    }

    #[test]
    fn test_subscribe_uses_default_layer() {
        let mut tracker = SubscriptionTracker::new();
        let added = tracker
            .subscribe("Order", "A", SubscribeOptions::default())
            .unwrap();

        assert_eq!(added, vec!["A"]);
        assert_eq!(tracker.layer_ids("default", "Order"), vec!["A"]);
    }

    #[test]
    fn test_configured_default_layer() {
        let mut tracker = SubscriptionTracker::with_config(TrackerConfig {
            default_layer: "base".to_string(),
            ..Default::default()
        });
        let events = capture(&mut tracker, ChangeKind::Subscribe);

        tracker
            .subscribe("Order", ["A"], SubscribeOptions::default())
            .unwrap();

        assert_eq!(tracker.layer_ids("base", "Order"), vec!["A"]);
        assert_eq!(events.lock()[0].trigger.layer, "base");
    }

    #[test]
    fn test_input_duplicates_collapse() {
        let mut tracker = SubscriptionTracker::new();
        let added = tracker
            .subscribe("Order", ["A", "A", "B"], SubscribeOptions::default())
            .unwrap();

        assert_eq!(added, vec!["A", "B"]);
        assert_eq!(tracker.layer_ids("default", "Order"), vec!["A", "B"]);
    }

    #[test]
    fn test_event_carries_entity_and_trigger() {
        let mut tracker = SubscriptionTracker::new();
        let events = capture(&mut tracker, ChangeKind::Unsubscribe);

        tracker
            .subscribe("Order", ["A"], SubscribeOptions::layer("grid"))
            .unwrap();
        tracker
            .unsubscribe("Order", ["A"], SubscribeOptions::layer("grid"))
            .unwrap();

        let events = events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity, "Order");
        assert_eq!(events[0].kind, ChangeKind::Unsubscribe);
        assert_eq!(events[0].unsubscribed, vec!["A"]);
        assert_eq!(
            events[0].trigger,
            Trigger {
                layer: "grid".to_string(),
                action: ChangeKind::Unsubscribe,
            }
        );
    }

    #[test]
    fn test_suppressed_operation_raises_nothing() {
        let mut tracker = SubscriptionTracker::new();
        let events = capture(&mut tracker, ChangeKind::Subscribe);

        let added = tracker
            .subscribe("Order", ["A"], SubscribeOptions::default().suppressed())
            .unwrap();

        assert_eq!(added, vec!["A"]);
        assert!(events.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_layer_leaves_no_state() {
        let mut tracker = SubscriptionTracker::new();
        let removed = tracker
            .unsubscribe("Order", ["A"], SubscribeOptions::layer("ghost"))
            .unwrap();

        assert!(removed.is_empty());
        assert!(tracker.get_subscribed_layers().is_empty());
    }

    #[test]
    fn test_resubscribe_dedups_requested_ids() {
        let mut tracker = SubscriptionTracker::new();
        let delta = tracker
            .resubscribe("Order", ["A", "A"], SubscribeOptions::default())
            .unwrap();

        assert_eq!(delta.subscribed, vec!["A"]);
        assert_eq!(tracker.layer_ids("default", "Order"), vec!["A"]);
    }

    #[test]
    fn test_is_subscribed_checks_every_layer() {
        let mut tracker = SubscriptionTracker::new();
        tracker
            .subscribe("Order", ["A"], SubscribeOptions::layer("L2"))
            .unwrap();

        assert!(tracker.is_subscribed("Order", "A"));
        assert!(!tracker.is_subscribed("Trade", "A"));
    }
}
