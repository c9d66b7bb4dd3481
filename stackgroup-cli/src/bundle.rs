//! On-disk project documents.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stackgroup::{ClearanceRelationBrand, InMemoryStore, LayerGroupSet, Netclass, PackageLayout, Project, StackupLayer};

use crate::CliError;

/// Everything the engine reads or writes for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBundle {
    pub project: Project,
    pub package: PackageLayout,
    #[serde(default)]
    pub netclasses: Vec<Netclass>,
    #[serde(default)]
    pub clearance_relations: Vec<ClearanceRelationBrand>,
}

impl ProjectBundle {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CliError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// A fresh store holding this bundle's documents.
    pub fn to_store(&self) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.seed(
            self.project.clone(),
            self.package.clone(),
            self.netclasses.clone(),
            self.clearance_relations.clone(),
        );
        store
    }

    /// This bundle with `package` and the store's current references.
    pub fn with_results(&self, package: PackageLayout, store: &InMemoryStore) -> Self {
        Self {
            project: self.project.clone(),
            netclasses: store.netclasses(&self.project.id),
            clearance_relations: store.clearance_relations(&self.project.id),
            package,
        }
    }
}

/// Read a stackup: a YAML list of layers.
pub fn load_stackup(path: impl AsRef<Path>) -> Result<Vec<StackupLayer>, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Read a JSON list of layer-group sets, as submitted by an editor.
pub fn load_sets(path: impl AsRef<Path>) -> Result<Vec<LayerGroupSet>, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
