//! Insertion-ordered set of subscribed ids.

use crate::types::SubscribedItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered, duplicate-free collection of ids for one (layer, entity) pair.
///
/// Iteration follows insertion order so results are reproducible; the
/// order carries no other meaning.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<SubscribedItem>", into = "Vec<SubscribedItem>")]
pub struct IdSet {
    order: Vec<SubscribedItem>,
    members: HashSet<SubscribedItem>,
}

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Insert an id. Returns false if it was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        self.members.insert(id.to_string());
        self.order.push(id.to_string());
        true
    }

    /// Remove an id. Returns false if it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|existing| existing == id) {
            self.order.remove(pos);
        }
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubscribedItem> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn to_vec(&self) -> Vec<SubscribedItem> {
        self.order.clone()
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for IdSet {}

impl From<Vec<SubscribedItem>> for IdSet {
    fn from(ids: Vec<SubscribedItem>) -> Self {
        let mut set = IdSet::new();
        for id in &ids {
            set.insert(id);
        }
        set
    }
}

impl From<IdSet> for Vec<SubscribedItem> {
    fn from(set: IdSet) -> Self {
        set.order
    }
}

impl<'a> IntoIterator for &'a IdSet {
    type Item = &'a SubscribedItem;
    type IntoIter = std::slice::Iter<'a, SubscribedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}
