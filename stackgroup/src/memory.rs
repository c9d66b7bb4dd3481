//! In-memory implementation of every collaborator trait.
//!
//! Keeps documents per project and records each collaborator call in order,
//! so callers can inspect exactly which assessments, copies and switch-ups
//! an operation performed.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::{
    ClearanceRelationBrand, LayerGroup, LayerGroupAction, Netclass, PackageLayout, Project, RuleArea,
};
use crate::services::{ConstraintService, LayoutRepository, LinkageService, ServiceResult};

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum ServiceCall {
    Snapshot {
        label: String,
    },
    ReplacePackage,
    ReplaceNetclasses {
        count: usize,
    },
    ReplaceClearanceRelations {
        count: usize,
    },
    Assess {
        action: LayerGroupAction,
        group_ids: Vec<String>,
        group_names: Vec<String>,
    },
    CopyConstraints {
        from: String,
        to: Vec<String>,
        rule_areas: usize,
    },
    PushDefaults,
    SortSlots,
    SwitchUp {
        element_id: String,
        new_set_id: String,
    },
}

#[derive(Debug, Default)]
struct State {
    packages: HashMap<String, PackageLayout>,
    projects: HashMap<String, Project>,
    netclasses: HashMap<String, Vec<Netclass>>,
    clearance_relations: HashMap<String, Vec<ClearanceRelationBrand>>,
    calls: Vec<ServiceCall>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load one project's documents, replacing anything stored for it.
    pub fn seed(
        &self,
        project: Project,
        package: PackageLayout,
        netclasses: Vec<Netclass>,
        clearance_relations: Vec<ClearanceRelationBrand>,
    ) {
        let mut state = self.state.lock();
        let id = project.id.clone();
        state.packages.insert(id.clone(), package);
        state.netclasses.insert(id.clone(), netclasses);
        state.clearance_relations.insert(id.clone(), clearance_relations);
        state.projects.insert(id, project);
    }

    pub fn package(&self, project_id: &str) -> Option<PackageLayout> {
        self.state.lock().packages.get(project_id).cloned()
    }

    pub fn netclasses(&self, project_id: &str) -> Vec<Netclass> {
        self.state.lock().netclasses.get(project_id).cloned().unwrap_or_default()
    }

    pub fn clearance_relations(&self, project_id: &str) -> Vec<ClearanceRelationBrand> {
        self.state
            .lock()
            .clearance_relations
            .get(project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.state.lock().calls.clone()
    }

    /// Assessment calls only, as `(action, group names)`.
    pub fn assessments(&self) -> Vec<(LayerGroupAction, Vec<String>)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ServiceCall::Assess { action, group_names, .. } => Some((*action, group_names.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        self.state.lock().calls.push(call);
    }
}

fn not_found(kind: &str, project_id: &str) -> ServiceError {
    ServiceError::new(format!("{kind} not found for project '{project_id}'"))
}

#[async_trait]
impl LayoutRepository for InMemoryStore {
    async fn get_package(&self, project_id: &str) -> ServiceResult<PackageLayout> {
        self.package(project_id).ok_or_else(|| not_found("package", project_id))
    }

    async fn get_project(&self, project_id: &str) -> ServiceResult<Project> {
        self.state
            .lock()
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| not_found("project", project_id))
    }

    async fn replace_package(&self, pkg: &PackageLayout) -> ServiceResult<PackageLayout> {
        let mut state = self.state.lock();
        state.packages.insert(pkg.project_id.clone(), pkg.clone());
        state.calls.push(ServiceCall::ReplacePackage);
        Ok(pkg.clone())
    }

    async fn get_netclasses(&self, project_id: &str) -> ServiceResult<Vec<Netclass>> {
        Ok(self.netclasses(project_id))
    }

    async fn replace_netclasses(&self, project_id: &str, netclasses: &[Netclass]) -> ServiceResult<()> {
        let mut state = self.state.lock();
        state.netclasses.insert(project_id.to_string(), netclasses.to_vec());
        state.calls.push(ServiceCall::ReplaceNetclasses { count: netclasses.len() });
        Ok(())
    }

    async fn get_clearance_relations(&self, project_id: &str) -> ServiceResult<Vec<ClearanceRelationBrand>> {
        Ok(self.clearance_relations(project_id))
    }

    async fn replace_clearance_relations(
        &self,
        project_id: &str,
        relations: &[ClearanceRelationBrand],
    ) -> ServiceResult<()> {
        let mut state = self.state.lock();
        state
            .clearance_relations
            .insert(project_id.to_string(), relations.to_vec());
        state.calls.push(ServiceCall::ReplaceClearanceRelations { count: relations.len() });
        Ok(())
    }

    async fn create_snapshot(&self, _project_id: &str, label: &str) -> ServiceResult<()> {
        self.record(ServiceCall::Snapshot { label: label.to_string() });
        Ok(())
    }
}

#[async_trait]
impl ConstraintService for InMemoryStore {
    async fn assess_layer_group_action(
        &self,
        _project_id: &str,
        action: LayerGroupAction,
        layer_groups: &[LayerGroup],
    ) -> ServiceResult<()> {
        self.record(ServiceCall::Assess {
            action,
            group_ids: layer_groups.iter().map(|lg| lg.id.clone()).collect(),
            group_names: layer_groups.iter().map(|lg| lg.name.clone()).collect(),
        });
        Ok(())
    }

    async fn copy_layer_group_constraints(
        &self,
        _project_id: &str,
        rule_areas: &[RuleArea],
        from: &LayerGroup,
        to: &[LayerGroup],
    ) -> ServiceResult<()> {
        self.record(ServiceCall::CopyConstraints {
            from: from.name.clone(),
            to: to.iter().map(|lg| lg.name.clone()).collect(),
            rule_areas: rule_areas.len(),
        });
        Ok(())
    }

    async fn push_default_constraints(&self, _project_id: &str) -> ServiceResult<()> {
        self.record(ServiceCall::PushDefaults);
        Ok(())
    }

    async fn sort_slots(&self, _project_id: &str) -> ServiceResult<()> {
        self.record(ServiceCall::SortSlots);
        Ok(())
    }
}

#[async_trait]
impl LinkageService for InMemoryStore {
    async fn switch_up_layer_group_set(
        &self,
        project_id: &str,
        element_id: &str,
        new_set_id: &str,
    ) -> ServiceResult<()> {
        let mut state = self.state.lock();
        let project = state
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| not_found("project", project_id))?;

        let linked = |links: &[crate::model::LinkageGroup]| -> Vec<String> {
            links
                .iter()
                .find(|g| g.element_ids.iter().any(|e| e == element_id))
                .map(|g| g.element_ids.clone())
                .unwrap_or_else(|| vec![element_id.to_string()])
        };

        let mut touched = false;
        if let Some(netclasses) = state.netclasses.get_mut(project_id) {
            if netclasses.iter().any(|n| n.id == element_id) {
                let targets = linked(&project.physical_links);
                for nc in netclasses.iter_mut().filter(|n| targets.contains(&n.id)) {
                    nc.layer_group_set_id = new_set_id.to_string();
                }
                touched = true;
            }
        }
        if let Some(relations) = state.clearance_relations.get_mut(project_id) {
            if relations.iter().any(|r| r.id == element_id) {
                let targets = linked(&project.clearance_links);
                for crb in relations.iter_mut().filter(|r| targets.contains(&r.id)) {
                    crb.value = new_set_id.to_string();
                }
                touched = true;
            }
        }
        if !touched {
            return Err(ServiceError::new(format!(
                "element '{element_id}' is neither a netclass nor a clearance relation"
            )));
        }

        state.calls.push(ServiceCall::SwitchUp {
            element_id: element_id.to_string(),
            new_set_id: new_set_id.to_string(),
        });
        Ok(())
    }
}
