//! Core types for the subscription tracker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a subscribed item.
pub type SubscribedItem = String;

/// Name of the layer used when an operation does not specify one.
pub const DEFAULT_LAYER: &str = "default";

/// Kind of change an operation performs.
///
/// Doubles as the event name listeners register under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Subscribe,
    Unsubscribe,
    Resubscribe,
}

impl ChangeKind {
    /// Every kind, in declaration order.
    pub const ALL: [ChangeKind; 3] = [
        ChangeKind::Subscribe,
        ChangeKind::Unsubscribe,
        ChangeKind::Resubscribe,
    ];

    /// Event name used for dispatch.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Subscribe => "subscribe",
            ChangeKind::Unsubscribe => "unsubscribe",
            ChangeKind::Resubscribe => "resubscribe",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused an event: the layer that was mutated and the public operation
/// the caller invoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub layer: String,
    pub action: ChangeKind,
}

/// Net change in global subscription state produced by one operation.
///
/// `subscribed` holds ids that are now subscribed in some layer and were not
/// before; `unsubscribed` holds ids that are no longer subscribed in any layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Entity type the operation addressed.
    pub entity: String,
    pub subscribed: Vec<SubscribedItem>,
    pub unsubscribed: Vec<SubscribedItem>,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub trigger: Trigger,
}

impl ChangeEvent {
    /// True when the event carries no change in either direction.
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty() && self.unsubscribed.is_empty()
    }
}

/// Union of ids subscribed for one entity type across all layers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIds {
    pub entity: String,
    pub ids: Vec<SubscribedItem>,
}

/// Result of a resubscribe: first-party additions and removals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResubscribeDelta {
    pub subscribed: Vec<SubscribedItem>,
    pub unsubscribed: Vec<SubscribedItem>,
}

/// Ids passed to a tracker operation.
///
/// Accepts a single id or any sequence of ids, so callers can write
/// `tracker.subscribe("Order", "A", ..)` as well as
/// `tracker.subscribe("Order", ["A", "B"], ..)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdList(Vec<SubscribedItem>);

impl IdList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[SubscribedItem] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<SubscribedItem> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<&str> for IdList {
    fn from(id: &str) -> Self {
        Self(vec![id.to_string()])
    }
}

impl From<String> for IdList {
    fn from(id: String) -> Self {
        Self(vec![id])
    }
}

impl From<Vec<String>> for IdList {
    fn from(ids: Vec<String>) -> Self {
        Self(ids)
    }
}

impl From<Vec<&str>> for IdList {
    fn from(ids: Vec<&str>) -> Self {
        Self(ids.into_iter().map(str::to_string).collect())
    }
}

impl From<&[String]> for IdList {
    fn from(ids: &[String]) -> Self {
        Self(ids.to_vec())
    }
}

impl From<&[&str]> for IdList {
    fn from(ids: &[&str]) -> Self {
        Self(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IdList {
    fn from(ids: [&str; N]) -> Self {
        Self(ids.iter().map(|id| id.to_string()).collect())
    }
}

impl FromIterator<String> for IdList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
