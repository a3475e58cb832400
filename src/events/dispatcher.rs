//! Named-event registry with synchronous fan-out.

use crate::error::{HandlerError, ListenerDetached, Result, TrackerError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handler invoked with each dispatched payload.
///
/// Handlers are compared by `Arc` identity when removed with
/// [`EventDispatcher::remove_listener`]. A handler that returns
/// [`ListenerDetached`] is unregistered during that dispatch.
pub type Listener<E> = Arc<dyn Fn(&E) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Handle returned for every registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

struct Registration<E> {
    id: ListenerId,
    handler: Listener<E>,
}

/// Maps event names to ordered handler lists.
///
/// `trigger` runs every handler for the name in registration order on the
/// caller's thread. The first handler error stops the fan-out and is returned
/// to the caller; handlers after it are not invoked. [`ListenerDetached`] is
/// not an error: the handler is dropped and the fan-out continues.
pub struct EventDispatcher<E> {
    handlers: HashMap<String, Vec<Registration<E>>>,
    next_id: u64,
}

impl<E> EventDispatcher<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Append a handler to the list for `event`.
    ///
    /// No de-duplication: registering the same handler twice makes it fire
    /// twice per trigger.
    pub fn add_listener(&mut self, event: &str, handler: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, handler });

        id
    }

    /// Remove the first registration of `handler` for `event`.
    ///
    /// Unknown events and handlers are reported with a warning and otherwise
    /// ignored. Returns whether a registration was removed.
    pub fn remove_listener(&mut self, event: &str, handler: &Listener<E>) -> bool {
        self.remove_where(event, |reg| Arc::ptr_eq(&reg.handler, handler))
    }

    /// Remove the registration identified by `id` for `event`.
    pub fn remove_listener_by_id(&mut self, event: &str, id: ListenerId) -> bool {
        self.remove_where(event, |reg| reg.id == id)
    }

    fn remove_where<F>(&mut self, event: &str, matches: F) -> bool
    where
        F: Fn(&Registration<E>) -> bool,
    {
        let pos = self
            .handlers
            .get(event)
            .and_then(|list| list.iter().position(&matches));

        match (pos, self.handlers.get_mut(event)) {
            (Some(pos), Some(list)) => {
                list.remove(pos);
                true
            }
            _ => {
                tracing::warn!(
                    event,
                    "attempted to remove a listener that was never registered"
                );
                false
            }
        }
    }

    /// Drop every handler registered for `event`.
    pub fn remove_all_listeners(&mut self, event: &str) {
        self.handlers.remove(event);
    }

    /// Invoke every handler registered for `event` with `payload`.
    pub fn trigger(&mut self, event: &str, payload: &E) -> Result<()> {
        let Some(list) = self.handlers.get(event) else {
            return Ok(());
        };

        tracing::trace!(event, handlers = list.len(), "dispatching event");

        let mut detached: Vec<Listener<E>> = Vec::new();
        let mut outcome = Ok(());

        for reg in list {
            match (reg.handler)(payload) {
                Ok(()) => {}
                Err(e) if e.is::<ListenerDetached>() => detached.push(Arc::clone(&reg.handler)),
                Err(source) => {
                    outcome = Err(TrackerError::Handler {
                        event: event.to_string(),
                        source,
                    });
                    break;
                }
            }
        }

        if !detached.is_empty() {
            self.purge(&detached);
        }

        outcome
    }

    /// Drop every registration of the given handlers, under any event name.
    fn purge(&mut self, detached: &[Listener<E>]) {
        let mut removed = 0;
        for list in self.handlers.values_mut() {
            let before = list.len();
            list.retain(|reg| !detached.iter().any(|d| Arc::ptr_eq(d, &reg.handler)));
            removed += before - list.len();
        }
        self.handlers.retain(|_, list| !list.is_empty());
        tracing::debug!(removed, "dropped detached listeners");
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    /// Names with at least one registered handler.
    pub fn event_names(&self) -> Vec<&str> {
        self.handlers
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}
