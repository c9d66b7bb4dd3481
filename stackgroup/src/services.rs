//! Collaborator interfaces: persistence, constraint engine, linkage.
//!
//! The layer-group core never talks to a database or the constraint engine
//! directly. Request handlers supply implementations of these traits;
//! [`crate::memory::InMemoryStore`] implements all of them for tests and
//! the CLI.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::model::{
    ClearanceRelationBrand, LayerGroup, LayerGroupAction, Netclass, PackageLayout, Project, RuleArea,
};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Document storage for packages, projects and the elements that point at
/// layer-group sets.
#[async_trait]
pub trait LayoutRepository: Send + Sync {
    async fn get_package(&self, project_id: &str) -> ServiceResult<PackageLayout>;

    async fn get_project(&self, project_id: &str) -> ServiceResult<Project>;

    /// Replace the stored package wholesale and return the stored copy.
    async fn replace_package(&self, pkg: &PackageLayout) -> ServiceResult<PackageLayout>;

    async fn get_netclasses(&self, project_id: &str) -> ServiceResult<Vec<Netclass>>;

    async fn replace_netclasses(&self, project_id: &str, netclasses: &[Netclass]) -> ServiceResult<()>;

    async fn get_clearance_relations(&self, project_id: &str) -> ServiceResult<Vec<ClearanceRelationBrand>>;

    async fn replace_clearance_relations(
        &self,
        project_id: &str,
        relations: &[ClearanceRelationBrand],
    ) -> ServiceResult<()>;

    /// Record a restorable snapshot of the project's current state.
    async fn create_snapshot(&self, project_id: &str, label: &str) -> ServiceResult<()>;
}

/// The constraint engine that owns per-layer-group constraint records.
#[async_trait]
pub trait ConstraintService: Send + Sync {
    /// Create or retire constraint records for the given layer groups.
    async fn assess_layer_group_action(
        &self,
        project_id: &str,
        action: LayerGroupAction,
        layer_groups: &[LayerGroup],
    ) -> ServiceResult<()>;

    /// Copy constraint values of `from` onto each of `to`, per rule area.
    async fn copy_layer_group_constraints(
        &self,
        project_id: &str,
        rule_areas: &[RuleArea],
        from: &LayerGroup,
        to: &[LayerGroup],
    ) -> ServiceResult<()>;

    async fn push_default_constraints(&self, project_id: &str) -> ServiceResult<()>;

    async fn sort_slots(&self, project_id: &str) -> ServiceResult<()>;
}

/// Re-points netclasses/clearance relations (and their linkage groups).
#[async_trait]
pub trait LinkageService: Send + Sync {
    async fn switch_up_layer_group_set(
        &self,
        project_id: &str,
        element_id: &str,
        new_set_id: &str,
    ) -> ServiceResult<()>;
}
