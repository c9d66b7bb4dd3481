//! Stackup layer classification.
//!
//! A layer can seed or join a layer group only when it is a routing metal
//! layer isolated by dielectric on both sides and neither it nor its
//! neighbours have zero thickness.

use std::collections::HashMap;

use crate::model::StackupLayer;

/// Returns `true` when `layer` must be skipped for grouping.
pub fn is_invalid_group(layer: &StackupLayer, before: &StackupLayer, after: &StackupLayer) -> bool {
    !layer.is_routing()
        || !layer.is_metal()
        || before.is_metal()
        || after.is_metal()
        || layer.thickness == 0.0
        || before.thickness == 0.0
        || after.thickness == 0.0
}

/// Index lookup over a stackup, resolving `index - 1` / `index + 1`
/// neighbours.
pub struct StackupIndex<'a> {
    by_index: HashMap<u32, &'a StackupLayer>,
}

impl<'a> StackupIndex<'a> {
    pub fn new(layers: &'a [StackupLayer]) -> Self {
        Self {
            by_index: layers.iter().map(|l| (l.index, l)).collect(),
        }
    }

    /// Neighbours of `layer`, or `None` when either side is missing.
    pub fn neighbours(&self, layer: &StackupLayer) -> Option<(&'a StackupLayer, &'a StackupLayer)> {
        let before = self.by_index.get(&layer.index.checked_sub(1)?).copied()?;
        let after = self.by_index.get(&layer.index.checked_add(1)?).copied()?;
        Some((before, after))
    }

    /// Whether `layer` qualifies for grouping in this stackup.
    pub fn is_groupable(&self, layer: &StackupLayer) -> bool {
        match self.neighbours(layer) {
            Some((before, after)) => !is_invalid_group(layer, before, after),
            None => false,
        }
    }
}
