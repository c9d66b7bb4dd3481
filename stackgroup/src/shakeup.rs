//! Stackup shakeup: reconcile existing layer-group sets with a freshly
//! generated grouping after a stackup edit.
//!
//! The work is split in two:
//!
//! 1. [`plan_shakeup`] is pure. It maps every existing golden layer group
//!    to its correspondents among the incoming groups, rewrites the custom
//!    sets onto the new ids and assembles the final collection. Every
//!    failure happens here, before anything is written.
//! 2. [`LayerGroupEngine::handle_stackup_shakeup`] executes the plan
//!    against the collaborators: constraint assessment and copy, package
//!    persistence, reference repair, then default propagation.

use std::collections::{HashMap, HashSet};

use crate::engine::LayerGroupEngine;
use crate::error::LayerGroupError;
use crate::generate::generate_layer_groups;
use crate::model::{
    Layer, LayerGroup, LayerGroupAction, LayerGroupSet, PackageLayout, Project, StackupLayer,
};

const SNAPSHOT_LABEL: &str = "Auto snapshot before stackup change";

/// How an existing golden layer group found its correspondents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Incoming groups made only of this group's layers (possibly a split).
    Subset,
    /// One incoming group holding all of this group's layers plus layers
    /// that were never grouped before.
    SupersetWithNovelty,
    /// No correspondent; the group and its constraint data go away.
    Dissolved,
}

#[derive(Debug, Clone)]
pub struct Correspondence {
    pub existing: LayerGroup,
    pub matched_by: MatchKind,
    /// Incoming groups taking over from `existing`, as they appear in the
    /// final golden set.
    pub targets: Vec<LayerGroup>,
}

#[derive(Debug, Clone)]
pub struct ShakeupPlan {
    pub correspondences: Vec<Correspondence>,
    /// Incoming groups that no existing group claimed.
    pub brand_new: Vec<LayerGroup>,
    /// Golden set first, then the surviving custom sets.
    pub final_sets: Vec<LayerGroupSet>,
    pub dropped_custom_sets: Vec<LayerGroupSet>,
}

impl ShakeupPlan {
    pub fn golden(&self) -> Option<&LayerGroupSet> {
        self.final_sets.iter().find(|s| s.is_golden)
    }

    pub fn dissolved(&self) -> impl Iterator<Item = &LayerGroup> {
        self.correspondences
            .iter()
            .filter(|c| c.matched_by == MatchKind::Dissolved)
            .map(|c| &c.existing)
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Build the shakeup plan for `sets` (the package's current layer-group
/// sets) against the `incoming` generator output.
pub fn plan_shakeup(sets: &[LayerGroupSet], incoming: &[LayerGroup]) -> Result<ShakeupPlan, LayerGroupError> {
    let golden = sets
        .iter()
        .find(|s| s.is_golden)
        .filter(|g| !g.layer_groups.is_empty())
        .ok_or(LayerGroupError::CannotReassess)?;

    if incoming.is_empty() {
        return Err(LayerGroupError::NoRoutableLayers {
            existing: golden.layer_groups.len(),
        });
    }

    let all_gd_layer_set: HashSet<&str> = golden
        .layer_groups
        .iter()
        .flat_map(|lg| lg.layers.iter().map(|l| l.name.as_str()))
        .collect();

    let mut consumed = vec![false; incoming.len()];
    let mut correspondences = Vec::with_capacity(golden.layer_groups.len());

    for existing in &golden.layer_groups {
        let (matched_by, picked) = find_correspondents(existing, incoming, &consumed, &all_gd_layer_set);
        for &i in &picked {
            consumed[i] = true;
        }
        let targets: Vec<LayerGroup> = picked
            .iter()
            .map(|&i| LayerGroup {
                is_active: existing.is_active,
                ..incoming[i].clone()
            })
            .collect();

        match matched_by {
            MatchKind::Dissolved => {
                tracing::warn!(group = %existing.name, "layer group has no correspondent and will be dissolved")
            }
            _ => tracing::debug!(
                group = %existing.name,
                ?matched_by,
                targets = ?targets.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "layer group correspondence"
            ),
        }

        correspondences.push(Correspondence {
            existing: existing.clone(),
            matched_by,
            targets,
        });
    }

    let brand_new: Vec<LayerGroup> = incoming
        .iter()
        .zip(&consumed)
        .filter(|(_, used)| !**used)
        .map(|(lg, _)| lg.clone())
        .collect();

    let mut golden_groups: Vec<LayerGroup> = correspondences
        .iter()
        .flat_map(|c| c.targets.iter().cloned())
        .chain(brand_new.iter().cloned())
        .collect();
    golden_groups.sort_by_key(|lg| lg.name.to_lowercase());

    let new_golden = LayerGroupSet {
        layer_groups: golden_groups,
        ..golden.clone()
    };

    let id_map: HashMap<&str, &[LayerGroup]> = correspondences
        .iter()
        .map(|c| (c.existing.id.as_str(), c.targets.as_slice()))
        .collect();

    let mut final_sets = vec![new_golden];
    let mut dropped_custom_sets = Vec::new();
    for set in sets.iter().filter(|s| !s.is_golden) {
        match rewrite_custom_set(set, &id_map, &brand_new) {
            Some(rewritten) => final_sets.push(rewritten),
            None => {
                tracing::warn!(set = %set.name, "custom layer group set no longer maps onto the stackup; dropping it");
                dropped_custom_sets.push(set.clone());
            }
        }
    }

    Ok(ShakeupPlan {
        correspondences,
        brand_new,
        final_sets,
        dropped_custom_sets,
    })
}

fn find_correspondents(
    existing: &LayerGroup,
    incoming: &[LayerGroup],
    consumed: &[bool],
    all_gd_layer_set: &HashSet<&str>,
) -> (MatchKind, Vec<usize>) {
    let existing_names = existing.layer_names();
    let available = || incoming.iter().enumerate().filter(|(i, _)| !consumed[*i]);

    let subset: Vec<usize> = available()
        .filter(|(_, lg)| !lg.layers.is_empty() && lg.layer_names().is_subset(&existing_names))
        .map(|(i, _)| i)
        .collect();
    if !subset.is_empty() {
        return (MatchKind::Subset, subset);
    }

    let superset: Vec<usize> = available()
        .filter(|(_, lg)| {
            lg.layers.len() > existing.layers.len()
                && lg.covers(existing)
                && lg
                    .layers
                    .iter()
                    .filter(|l| !existing.contains_layer(&l.name))
                    .all(|l| !all_gd_layer_set.contains(l.name.as_str()))
        })
        .map(|(i, _)| i)
        .collect();
    if superset.len() == 1 {
        return (MatchKind::SupersetWithNovelty, superset);
    }

    (MatchKind::Dissolved, Vec::new())
}

/// Re-point every layer group of a custom set at a group of the new golden
/// grouping. `None` when any group cannot be placed.
fn rewrite_custom_set(
    set: &LayerGroupSet,
    id_map: &HashMap<&str, &[LayerGroup]>,
    brand_new: &[LayerGroup],
) -> Option<LayerGroupSet> {
    let mut used_targets: HashSet<&str> = HashSet::new();
    let mut layer_groups = Vec::with_capacity(set.layer_groups.len());

    for lg in &set.layer_groups {
        if lg.layers.is_empty() {
            return None;
        }
        // A single correspondent takes the group over whatever its layers;
        // layer coverage only picks between the halves of a split.
        let mapped = id_map.get(lg.id.as_str()).and_then(|targets| match *targets {
            [only] => Some(only),
            split => split.iter().find(|t| t.covers(lg)),
        });
        let target = mapped.or_else(|| brand_new.iter().find(|b| b.covers(lg)))?;

        if !used_targets.insert(target.id.as_str()) {
            return None;
        }

        let layers: Vec<Layer> = lg
            .layers
            .iter()
            .map(|l| match target.layers.iter().find(|t| t.name == l.name) {
                Some(t) => Layer {
                    is_active: l.is_active,
                    tags: l.tags.clone(),
                    ..t.clone()
                },
                None => l.clone(),
            })
            .collect();

        layer_groups.push(LayerGroup {
            id: target.id.clone(),
            layers,
            ..lg.clone()
        });
    }

    Some(LayerGroupSet {
        layer_groups,
        ..set.clone()
    })
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

impl LayerGroupEngine {
    /// Regenerate layer groups for `input_stackup_layers` and reconcile the
    /// package's layer-group sets with them.
    ///
    /// On success `pkg` carries the new stackup and sets. On failure `pkg`
    /// is left untouched.
    pub async fn evaluate_lgsets_for_stackup_change(
        &self,
        input_stackup_layers: &[StackupLayer],
        pkg: &mut PackageLayout,
        project: &Project,
        perform_sep_fs_bs_grouping: bool,
        freshest: bool,
    ) -> Result<Vec<LayerGroupSet>, LayerGroupError> {
        let _guard = self.locks.acquire(&project.id).await;

        if freshest {
            let groups =
                generate_layer_groups(project, input_stackup_layers, perform_sep_fs_bs_grouping, &self.config)?;
            let fresh = LayerGroupSet::golden(self.config.golden_set_name.clone(), groups);
            let fresh_sets = std::slice::from_ref(&fresh);
            self.repair_set_references(&project.id, fresh_sets, &fresh.id).await?;
            pkg.layer_group_sets = vec![fresh];
            pkg.stackup_layers = input_stackup_layers.to_vec();
            tracing::info!(project = %project.id, "installed fresh golden layer group set");
            return Ok(pkg.layer_group_sets.clone());
        }

        let incoming_routing = input_stackup_layers.iter().any(StackupLayer::is_routing);
        let existing_routing = pkg.stackup_layers.iter().any(StackupLayer::is_routing);
        if !incoming_routing && !existing_routing {
            tracing::info!(project = %project.id, "no routing layers before or after the edit; layer groups unchanged");
            return Ok(pkg.layer_group_sets.clone());
        }

        let incoming =
            generate_layer_groups(project, input_stackup_layers, perform_sep_fs_bs_grouping, &self.config)?;

        if pkg.golden_set().is_none() && !pkg.layer_group_sets.is_empty() {
            return Err(LayerGroupError::MissingGoldenSet {
                project_id: project.id.clone(),
            });
        }
        let has_golden_groups = pkg.golden_set().is_some_and(|g| !g.layer_groups.is_empty());
        if has_golden_groups && incoming.is_empty() {
            return Err(LayerGroupError::NoRoutableLayers {
                existing: pkg.golden_set().map_or(0, |g| g.layer_groups.len()),
            });
        }

        self.repo.create_snapshot(&project.id, SNAPSHOT_LABEL).await?;

        let mut working = pkg.clone();
        working.stackup_layers = input_stackup_layers.to_vec();

        let result = if has_golden_groups {
            self.shakeup_unlocked(&mut working, project, incoming).await?
        } else if working.layer_group_sets.is_empty() {
            working.layer_group_sets = vec![LayerGroupSet::golden(self.config.golden_set_name.clone(), incoming)];
            working.layer_group_sets.clone()
        } else {
            if let Some(golden) = working.golden_set_mut() {
                golden.layer_groups = incoming.clone();
            }
            if !incoming.is_empty() {
                self.constraints
                    .assess_layer_group_action(&project.id, LayerGroupAction::Addition, &incoming)
                    .await?;
            }
            working.layer_group_sets.clone()
        };

        if !has_golden_groups {
            self.repo.replace_package(&working).await?;
            self.constraints.push_default_constraints(&project.id).await?;
        }
        *pkg = working;
        Ok(result)
    }

    /// Migrate the golden set (and everything that hangs off it) onto
    /// `incoming_new_layer_groups`.
    pub async fn handle_stackup_shakeup(
        &self,
        pkg: &mut PackageLayout,
        project: &Project,
        incoming_new_layer_groups: Vec<LayerGroup>,
    ) -> Result<Vec<LayerGroupSet>, LayerGroupError> {
        let _guard = self.locks.acquire(&project.id).await;
        self.shakeup_unlocked(pkg, project, incoming_new_layer_groups).await
    }

    async fn shakeup_unlocked(
        &self,
        pkg: &mut PackageLayout,
        project: &Project,
        incoming: Vec<LayerGroup>,
    ) -> Result<Vec<LayerGroupSet>, LayerGroupError> {
        let plan = plan_shakeup(&pkg.layer_group_sets, &incoming)?;
        let pid = project.id.as_str();

        tracing::info!(
            project = pid,
            existing = plan.correspondences.len(),
            brand_new = plan.brand_new.len(),
            dropped_sets = plan.dropped_custom_sets.len(),
            "executing stackup shakeup"
        );

        // Constraint data follows each existing group to its correspondents.
        for corr in &plan.correspondences {
            if !corr.targets.is_empty() {
                self.constraints
                    .assess_layer_group_action(pid, LayerGroupAction::Addition, &corr.targets)
                    .await?;
                self.constraints
                    .copy_layer_group_constraints(pid, &pkg.rule_areas, &corr.existing, &corr.targets)
                    .await?;
            }
            self.constraints
                .assess_layer_group_action(pid, LayerGroupAction::Removal, std::slice::from_ref(&corr.existing))
                .await?;
        }
        if !plan.brand_new.is_empty() {
            self.constraints
                .assess_layer_group_action(pid, LayerGroupAction::Addition, &plan.brand_new)
                .await?;
        }

        pkg.layer_group_sets = plan.final_sets.clone();
        self.repo.replace_package(pkg).await?;

        let golden_id = plan
            .golden()
            .map(|g| g.id.clone())
            .ok_or(LayerGroupError::CannotReassess)?;
        self.repair_set_references(pid, &plan.final_sets, &golden_id).await?;

        self.constraints.push_default_constraints(pid).await?;
        self.constraints.sort_slots(pid).await?;

        Ok(plan.final_sets)
    }

    /// Point netclasses and clearance relations whose layer-group set no
    /// longer exists at the golden set.
    async fn repair_set_references(
        &self,
        project_id: &str,
        final_sets: &[LayerGroupSet],
        golden_id: &str,
    ) -> Result<(), LayerGroupError> {
        let valid: HashSet<&str> = final_sets.iter().map(|s| s.id.as_str()).collect();

        let mut netclasses = self.repo.get_netclasses(project_id).await?;
        let mut repaired = 0usize;
        for nc in netclasses.iter_mut().filter(|nc| !valid.contains(nc.layer_group_set_id.as_str())) {
            nc.layer_group_set_id = golden_id.to_string();
            repaired += 1;
        }
        if repaired > 0 {
            tracing::info!(project = project_id, count = repaired, "repointed netclasses to golden set");
            self.repo.replace_netclasses(project_id, &netclasses).await?;
        }

        let mut relations = self.repo.get_clearance_relations(project_id).await?;
        let mut repaired = 0usize;
        for crb in relations.iter_mut().filter(|crb| !valid.contains(crb.value.as_str())) {
            crb.value = golden_id.to_string();
            repaired += 1;
        }
        if repaired > 0 {
            tracing::info!(project = project_id, count = repaired, "repointed clearance relations to golden set");
            self.repo.replace_clearance_relations(project_id, &relations).await?;
        }

        Ok(())
    }
}
