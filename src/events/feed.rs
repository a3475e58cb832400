//! Channel-backed listener for pull-style consumers.

use crate::error::{HandlerError, ListenerDetached, Result};
use crate::types::{ChangeEvent, ChangeKind};
use crossbeam_channel::{bounded, Receiver, TrySendError};
use std::sync::Arc;
use std::time::Duration;

use super::{Listener, ListenerId};

/// Configuration for a change feed.
#[derive(Clone, Debug)]
pub struct ChangeFeedConfig {
    /// Max buffered events. Events arriving while the buffer is full are
    /// dropped for this feed only.
    /// Default: 1024
    pub buffer_size: usize,

    /// Event kinds to receive.
    /// Default: all kinds
    pub kinds: Vec<ChangeKind>,
}

impl Default for ChangeFeedConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            kinds: ChangeKind::ALL.to_vec(),
        }
    }
}

impl ChangeFeedConfig {
    /// Receive only the given kinds.
    pub fn kinds(kinds: impl IntoIterator<Item = ChangeKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// Receiving end of a change feed.
///
/// Created by [`SubscriptionTracker::open_feed`](crate::SubscriptionTracker::open_feed).
/// Dropping the feed disconnects the channel. Its listener detaches itself on
/// the next event it is offered, or immediately through
/// [`close_feed`](crate::SubscriptionTracker::close_feed).
pub struct ChangeFeed {
    pub(crate) registrations: Vec<(ChangeKind, ListenerId)>,
    receiver: Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Build the listener and the receiving end sharing one bounded channel.
    pub(crate) fn channel(buffer_size: usize) -> (Listener<ChangeEvent>, Receiver<ChangeEvent>) {
        let (sender, receiver) = bounded(buffer_size.max(1));

        let listener: Listener<ChangeEvent> = Arc::new(
            move |event: &ChangeEvent| -> std::result::Result<(), HandlerError> {
                match sender.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        tracing::warn!(
                            kind = %dropped.kind,
                            entity = %dropped.entity,
                            "change feed buffer full, dropping event"
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        tracing::debug!("change feed receiver dropped, detaching");
                        return Err(Box::new(ListenerDetached));
                    }
                }
                Ok(())
            },
        );

        (listener, receiver)
    }

    pub(crate) fn new(
        registrations: Vec<(ChangeKind, ListenerId)>,
        receiver: Receiver<ChangeEvent>,
    ) -> Self {
        Self {
            registrations,
            receiver,
        }
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChangeEvent> {
        Ok(self.receiver.recv()?)
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ChangeEvent> {
        Ok(self.receiver.recv_timeout(timeout)?)
    }

    /// Take every buffered event without blocking.
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of events waiting in the buffer.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
