//! Layer -> entity type -> id set mapping.

use crate::error::Result;
use crate::types::{EntityIds, SubscribedItem};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::IdSet;

/// Ids subscribed for one entity type within a layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySet {
    entity: String,
    ids: IdSet,
}

impl EntitySet {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn ids(&self) -> &IdSet {
        &self.ids
    }
}

/// One named partition of subscription state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layer {
    name: String,
    entities: Vec<EntitySet>,
}

impl Layer {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity sets in first-seen order.
    pub fn entities(&self) -> impl Iterator<Item = &EntitySet> {
        self.entities.iter()
    }

    pub fn get(&self, entity: &str) -> Option<&IdSet> {
        self.entities
            .iter()
            .find(|set| set.entity == entity)
            .map(|set| &set.ids)
    }

    fn get_or_create(&mut self, entity: &str) -> &mut IdSet {
        let pos = match self.entities.iter().position(|set| set.entity == entity) {
            Some(pos) => pos,
            None => {
                self.entities.push(EntitySet {
                    entity: entity.to_string(),
                    ids: IdSet::new(),
                });
                self.entities.len() - 1
            }
        };
        &mut self.entities[pos].ids
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Full subscription state, owned by the tracker.
///
/// Layers and entity sets are created on first access through
/// [`LayerMap::entry_mut`] and removed again by [`LayerMap::prune`] once they
/// are empty, so an absent set and an empty set are never both observable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerMap {
    layers: Vec<Layer>,
}

impl LayerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create accessor for the id set of `(layer, entity)`.
    pub fn entry_mut(&mut self, layer: &str, entity: &str) -> &mut IdSet {
        let pos = match self.layers.iter().position(|l| l.name == layer) {
            Some(pos) => pos,
            None => {
                self.layers.push(Layer::new(layer));
                self.layers.len() - 1
            }
        };
        self.layers[pos].get_or_create(entity)
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Layers in first-seen order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn get(&self, layer: &str, entity: &str) -> Option<&IdSet> {
        self.layer(layer).and_then(|l| l.get(entity))
    }

    pub fn contains(&self, layer: &str, entity: &str, id: &str) -> bool {
        self.get(layer, entity).is_some_and(|ids| ids.contains(id))
    }

    /// True iff no layer other than `layer` holds `id` for `entity`.
    pub fn is_exclusive_to(&self, layer: &str, entity: &str, id: &str) -> bool {
        !self
            .layers
            .iter()
            .filter(|l| l.name != layer)
            .any(|l| l.get(entity).is_some_and(|ids| ids.contains(id)))
    }

    /// True iff any layer holds `id` for `entity`.
    pub fn is_subscribed(&self, entity: &str, id: &str) -> bool {
        self.layers
            .iter()
            .any(|l| l.get(entity).is_some_and(|ids| ids.contains(id)))
    }

    /// Drop the `(layer, entity)` set if empty, and the layer if that leaves
    /// it without entities.
    pub fn prune(&mut self, layer: &str, entity: &str) {
        let Some(pos) = self.layers.iter().position(|l| l.name == layer) else {
            return;
        };
        let l = &mut self.layers[pos];
        l.entities.retain(|set| set.entity != entity || !set.ids.is_empty());
        if l.is_empty() {
            self.layers.remove(pos);
        }
    }

    /// Union of ids per entity type across every layer, de-duplicated, in
    /// first-seen order.
    pub fn union_by_entity(&self) -> Vec<EntityIds> {
        let mut merged: Vec<(String, IdSet)> = Vec::new();

        for layer in &self.layers {
            for set in &layer.entities {
                let pos = match merged.iter().position(|(e, _)| *e == set.entity) {
                    Some(pos) => pos,
                    None => {
                        merged.push((set.entity.clone(), IdSet::new()));
                        merged.len() - 1
                    }
                };
                for id in &set.ids {
                    merged[pos].1.insert(id);
                }
            }
        }

        merged
            .into_iter()
            .map(|(entity, ids)| EntityIds {
                entity,
                ids: ids.into(),
            })
            .collect()
    }

    /// Ids held by `layer` for `entity`, empty if none.
    pub fn ids(&self, layer: &str, entity: &str) -> Vec<SubscribedItem> {
        self.get(layer, entity).map(IdSet::to_vec).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Render the mapping as JSON for debugging dumps.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Serialize for LayerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.layers.len()))?;
        for layer in &self.layers {
            map.serialize_entry(&layer.name, layer)?;
        }
        map.end()
    }
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entities.len()))?;
        for set in &self.entities {
            map.serialize_entry(&set.entity, &set.ids)?;
        }
        map.end()
    }
}
