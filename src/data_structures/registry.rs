//! Mapping from tone keys to the meshes that were loaded for them.

use std::collections::HashMap;

use anyhow::bail;

use crate::data_structures::{
    scene_graph::MeshId,
    tone::{ToneKey, ToneSet},
};

/// One entry per registered [`ToneKey`]; unset until that tone finished loading.
///
/// Entries are populated exactly once. Iteration follows the registration order
/// of the [`ToneSet`] and only yields populated entries.
#[derive(Clone, Debug, Default)]
pub struct ToneRegistry {
    order: Vec<ToneKey>,
    entries: HashMap<ToneKey, Option<Vec<MeshId>>>,
}

impl ToneRegistry {
    pub fn new(tones: &ToneSet) -> Self {
        let order: Vec<ToneKey> = tones.iter().cloned().collect();
        let entries = order.iter().map(|key| (key.clone(), None)).collect();
        Self { order, entries }
    }

    pub fn contains(&self, key: &ToneKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_populated(&self, key: &ToneKey) -> bool {
        matches!(self.entries.get(key), Some(Some(_)))
    }

    /// Meshes of a loaded tone. `None` for unknown or not yet loaded tones.
    pub fn get(&self, key: &ToneKey) -> Option<&[MeshId]> {
        self.entries
            .get(key)
            .and_then(|entry| entry.as_deref())
    }

    pub fn insert(&mut self, key: ToneKey, meshes: Vec<MeshId>) -> anyhow::Result<()> {
        match self.entries.get_mut(&key) {
            None => bail!("Tone {} is not registered", key),
            Some(Some(_)) => bail!("Tone {} was already loaded", key),
            Some(entry) => {
                *entry = Some(meshes);
                Ok(())
            }
        }
    }

    /// Number of tones whose meshes are stored.
    pub fn populated(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ToneKey, &[MeshId])> {
        self.order
            .iter()
            .filter_map(|key| self.get(key).map(|meshes| (key, meshes)))
    }
}
