//! Error types for layer-group operations.

use thiserror::Error;

/// Failure reported by an external collaborator (repository, constraint
/// engine, linkage service).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum LayerGroupError {
    #[error("No golden layer group set exists for project '{project_id}'")]
    MissingGoldenSet { project_id: String },

    #[error("Cannot process layer group reassessment: golden layer group set has no layer groups")]
    CannotReassess,

    #[error(
        "Stackup change leaves no routable layer while the golden set still has {existing} layer group(s); \
         select at least one routing layer before saving"
    )]
    NoRoutableLayers { existing: usize },

    #[error("Duplicate {kind} names are not allowed: {names:?}")]
    DuplicateNames { kind: &'static str, names: Vec<String> },

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Layer group set '{set_name}' references layer group '{layer_group_id}' which is not in the golden set")]
    UnknownLayerGroupReference {
        set_name: String,
        layer_group_id: String,
    },

    #[error(
        "Layer group '{layer_group}' removed from set '{set_name}' leaves layers unassigned: {layers:?}"
    )]
    UnassignedLayers {
        set_name: String,
        layer_group: String,
        layers: Vec<String>,
    },

    #[error("Layer '{layer}' appears in more than one layer group of set '{set_name}'")]
    LayerInMultipleGroups { set_name: String, layer: String },

    #[error("Layer group set '{id}' does not exist")]
    UnknownLayerGroupSet { id: String },

    #[error("Layer group generation produced inconsistent output: {0}")]
    GenerationInvariant(String),

    #[error("Collaborator error: {0}")]
    Service(#[from] ServiceError),
}
