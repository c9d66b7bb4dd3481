//! Data model for stackups, layer groups and the documents that point at them.
//!
//! All types derive [`serde::Serialize`] and [`serde::Deserialize`] with
//! camelCase field names so stored package/netclass documents load as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tag values carried on layer groups and layer-group sets.
pub mod tags {
    /// Marks a layer group produced by the generator.
    pub const AUTO: &str = "Auto";
    /// Marks the golden layer-group set.
    pub const GOLDEN: &str = "Golden";
    /// Sort priority of the golden set (always first).
    pub const SORT_PRIORITY: &str = "SortPriority_0";
    /// Transient marker on a layer-group set the client wants created.
    pub const ADDED_LGSET: &str = "ADDED_LGSET";
}

/// Mint a fresh element id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Stackup
// ---------------------------------------------------------------------------

/// Physical kind of a stackup layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackupLayerType {
    Metal,
    Dielectric,
    SolderResist,
    #[serde(other)]
    Other,
}

/// Routing classification selected for a stackup layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingLayerType {
    #[default]
    None,
    Signal,
    Plane,
    Mixed,
}

/// Which face of the package a layer sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerSide {
    Front,
    Back,
    #[default]
    Neither,
}

/// One physical layer of the stackup, ordered by `index` (1-based).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackupLayer {
    pub name: String,
    pub index: u32,
    #[serde(rename = "type")]
    pub layer_type: StackupLayerType,
    #[serde(default)]
    pub routing_layer_type: RoutingLayerType,
    pub thickness: f64,
    #[serde(default)]
    pub side: LayerSide,
    #[serde(default)]
    pub material: String,
}

impl StackupLayer {
    /// Whether a routing classification has been selected for this layer.
    pub fn is_routing(&self) -> bool {
        self.routing_layer_type != RoutingLayerType::None
    }

    pub fn is_metal(&self) -> bool {
        self.layer_type == StackupLayerType::Metal
    }
}

// ---------------------------------------------------------------------------
// Layer groups
// ---------------------------------------------------------------------------

/// Reference to a stackup layer from inside a [`LayerGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            is_active: true,
            tags: Vec::new(),
        }
    }
}

/// Electrically-equivalent layers sharing one constraint dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerGroup {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LayerGroup {
    /// Names of the member layers.
    pub fn layer_names(&self) -> BTreeSet<&str> {
        self.layers.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn contains_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    /// True when every layer of `other` is also a layer of `self`.
    pub fn covers(&self, other: &LayerGroup) -> bool {
        other.layers.iter().all(|l| self.contains_layer(&l.name))
    }
}

/// A named grouping scheme over the routing layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerGroupSet {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_golden: bool,
    pub layer_groups: Vec<LayerGroup>,
    #[serde(default)]
    pub is_physical_default: bool,
    #[serde(default)]
    pub is_clearance_default: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LayerGroupSet {
    /// A new golden set wrapping generator output.
    pub fn golden(name: impl Into<String>, layer_groups: Vec<LayerGroup>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            is_golden: true,
            layer_groups,
            is_physical_default: true,
            is_clearance_default: true,
            tags: vec![tags::GOLDEN.to_string(), tags::SORT_PRIORITY.to_string()],
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A named design region with its own constraint dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleArea {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Per-project layout document: stackup, layer-group sets, rule areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageLayout {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub stackup_layers: Vec<StackupLayer>,
    #[serde(default)]
    pub layer_group_sets: Vec<LayerGroupSet>,
    #[serde(default)]
    pub rule_areas: Vec<RuleArea>,
}

impl PackageLayout {
    pub fn golden_set(&self) -> Option<&LayerGroupSet> {
        self.layer_group_sets.iter().find(|s| s.is_golden)
    }

    pub fn golden_set_mut(&mut self) -> Option<&mut LayerGroupSet> {
        self.layer_group_sets.iter_mut().find(|s| s.is_golden)
    }
}

// ---------------------------------------------------------------------------
// Documents referring to layer-group sets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Netclass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interface_id: String,
    pub layer_group_set_id: String,
}

/// A clearance relation; `value` holds the id of its layer-group set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearanceRelationBrand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interface_id: String,
    pub value: String,
}

/// Elements that share a single layer-group-set mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkageGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Netclass linkage groups.
    #[serde(default)]
    pub physical_links: Vec<LinkageGroup>,
    /// Clearance relation linkage groups.
    #[serde(default)]
    pub clearance_links: Vec<LinkageGroup>,
}

/// What happened to a layer group, for constraint assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerGroupAction {
    Addition,
    Removal,
}

fn default_true() -> bool {
    true
}
