//! Explicit (user-driven) additions, updates and deletions of layer-group
//! sets.
//!
//! [`prepare_lgset_changes`] validates the whole batch against the stored
//! package without side effects; [`LayerGroupEngine::process_lgset_changes`]
//! then re-points references away from deleted sets, persists, and runs
//! constraint assessment for layer groups that genuinely appeared or
//! disappeared.

use std::collections::{HashMap, HashSet};

use crate::config::NameRules;
use crate::engine::LayerGroupEngine;
use crate::error::LayerGroupError;
use crate::model::{new_id, tags, LayerGroup, LayerGroupAction, LayerGroupSet, PackageLayout, Project};
use crate::naming::{duplicate_names, verify_naming, NameKind};

/// A validated batch of layer-group-set changes.
#[derive(Debug, Clone)]
pub struct LgSetChanges {
    /// New sets, with ids assigned and transient tags cleared.
    pub added: Vec<LayerGroupSet>,
    /// Updated sets, with missing layer group ids assigned.
    pub updated: Vec<LayerGroupSet>,
    /// Stored sets absent from the input (never the golden set).
    pub deleted: Vec<LayerGroupSet>,
    pub golden_id: String,
    /// The complete collection to persist.
    pub final_sets: Vec<LayerGroupSet>,
}

/// Validate `incoming` against the stored package.
pub fn prepare_lgset_changes(
    existing: &PackageLayout,
    incoming: &[LayerGroupSet],
    rules: &NameRules,
) -> Result<LgSetChanges, LayerGroupError> {
    let golden = existing
        .golden_set()
        .ok_or_else(|| LayerGroupError::MissingGoldenSet {
            project_id: existing.project_id.clone(),
        })?;
    let existing_by_id: HashMap<&str, &LayerGroupSet> =
        existing.layer_group_sets.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut added = Vec::new();
    let mut updated = Vec::new();
    for set in incoming {
        if set.id.is_empty() || set.has_tag(tags::ADDED_LGSET) {
            added.push(set.clone());
        } else if existing_by_id.contains_key(set.id.as_str()) {
            updated.push(set.clone());
        } else {
            return Err(LayerGroupError::UnknownLayerGroupSet { id: set.id.clone() });
        }
    }

    let kept_ids: HashSet<&str> = updated.iter().map(|s| s.id.as_str()).collect();
    let deleted: Vec<LayerGroupSet> = existing
        .layer_group_sets
        .iter()
        .filter(|s| !s.is_golden && !kept_ids.contains(s.id.as_str()))
        .cloned()
        .collect();

    if !added.is_empty() {
        validate_added(&mut added, existing, golden, rules)?;
    }
    if !updated.is_empty() {
        validate_updated(&mut updated, &added, &existing_by_id, rules)?;
    }

    // Stored order is kept; the golden set survives even when omitted.
    let updated_by_id: HashMap<&str, &LayerGroupSet> = updated.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut final_sets: Vec<LayerGroupSet> = existing
        .layer_group_sets
        .iter()
        .filter_map(|s| match updated_by_id.get(s.id.as_str()) {
            Some(u) => Some((*u).clone()),
            None if s.is_golden => Some(s.clone()),
            None => None,
        })
        .collect();
    final_sets.extend(added.iter().cloned());

    Ok(LgSetChanges {
        golden_id: golden.id.clone(),
        added,
        updated,
        deleted,
        final_sets,
    })
}

fn validate_added(
    added: &mut [LayerGroupSet],
    existing: &PackageLayout,
    golden: &LayerGroupSet,
    rules: &NameRules,
) -> Result<(), LayerGroupError> {
    let dups = duplicate_names(
        added
            .iter()
            .map(|s| s.name.as_str())
            .chain(existing.layer_group_sets.iter().map(|s| s.name.as_str())),
    );
    if !dups.is_empty() {
        return Err(LayerGroupError::DuplicateNames {
            kind: NameKind::LayerGroupSet.label(),
            names: dups,
        });
    }
    verify_naming(added.iter().map(|s| s.name.as_str()), NameKind::LayerGroupSet, rules)?;

    let golden_ids: HashSet<&str> = golden.layer_groups.iter().map(|lg| lg.id.as_str()).collect();
    for set in added.iter_mut() {
        if let Some(lg) = set.layer_groups.iter().find(|lg| !golden_ids.contains(lg.id.as_str())) {
            return Err(LayerGroupError::UnknownLayerGroupReference {
                set_name: set.name.clone(),
                layer_group_id: lg.id.clone(),
            });
        }
        set.id = new_id();
        set.is_golden = false;
        set.tags.retain(|t| t != tags::ADDED_LGSET);
    }
    Ok(())
}

fn validate_updated(
    updated: &mut [LayerGroupSet],
    added: &[LayerGroupSet],
    existing_by_id: &HashMap<&str, &LayerGroupSet>,
    rules: &NameRules,
) -> Result<(), LayerGroupError> {
    let dups = duplicate_names(
        updated
            .iter()
            .map(|s| s.name.as_str())
            .chain(added.iter().map(|s| s.name.as_str())),
    );
    if !dups.is_empty() {
        return Err(LayerGroupError::DuplicateNames {
            kind: NameKind::LayerGroupSet.label(),
            names: dups,
        });
    }
    verify_naming(updated.iter().map(|s| s.name.as_str()), NameKind::LayerGroupSet, rules)?;

    for set in updated.iter_mut() {
        let lg_dups = duplicate_names(set.layer_groups.iter().map(|lg| lg.name.as_str()));
        if !lg_dups.is_empty() {
            return Err(LayerGroupError::DuplicateNames {
                kind: NameKind::LayerGroup.label(),
                names: lg_dups,
            });
        }
        verify_naming(
            set.layer_groups.iter().map(|lg| lg.name.as_str()),
            NameKind::LayerGroup,
            rules,
        )?;

        for lg in set.layer_groups.iter_mut().filter(|lg| lg.id.is_empty()) {
            lg.id = new_id();
        }

        check_single_membership(set)?;

        let Some(stored) = existing_by_id.get(set.id.as_str()) else {
            return Err(LayerGroupError::UnknownLayerGroupSet { id: set.id.clone() });
        };
        check_removed_groups_redistributed(stored, set)?;
        set.is_golden = stored.is_golden;
    }
    Ok(())
}

fn check_single_membership(set: &LayerGroupSet) -> Result<(), LayerGroupError> {
    let mut seen = HashSet::new();
    for layer in set.layer_groups.iter().flat_map(|lg| lg.layers.iter()) {
        if !seen.insert(layer.name.as_str()) {
            return Err(LayerGroupError::LayerInMultipleGroups {
                set_name: set.name.clone(),
                layer: layer.name.clone(),
            });
        }
    }
    Ok(())
}

/// Layers of a removed layer group must land in another group of the set.
fn check_removed_groups_redistributed(stored: &LayerGroupSet, updated: &LayerGroupSet) -> Result<(), LayerGroupError> {
    let surviving_ids: HashSet<&str> = updated.layer_groups.iter().map(|lg| lg.id.as_str()).collect();
    let assigned: HashSet<&str> = updated
        .layer_groups
        .iter()
        .flat_map(|lg| lg.layers.iter().map(|l| l.name.as_str()))
        .collect();

    for removed in stored
        .layer_groups
        .iter()
        .filter(|lg| !surviving_ids.contains(lg.id.as_str()))
    {
        let orphaned: Vec<String> = removed
            .layers
            .iter()
            .filter(|l| !assigned.contains(l.name.as_str()))
            .map(|l| l.name.clone())
            .collect();
        if !orphaned.is_empty() {
            return Err(LayerGroupError::UnassignedLayers {
                set_name: updated.name.clone(),
                layer_group: removed.name.clone(),
                layers: orphaned,
            });
        }
    }
    Ok(())
}

fn layer_groups_by_id(sets: &[LayerGroupSet]) -> HashMap<&str, &LayerGroup> {
    let mut map = HashMap::new();
    for lg in sets.iter().flat_map(|s| s.layer_groups.iter()) {
        map.entry(lg.id.as_str()).or_insert(lg);
    }
    map
}

impl LayerGroupEngine {
    /// Apply a client's edited collection of layer-group sets to the
    /// stored package for `input_pkg.project_id`.
    pub async fn process_lgset_changes(&self, input_pkg: PackageLayout) -> Result<PackageLayout, LayerGroupError> {
        let pid = input_pkg.project_id.clone();
        let _guard = self.locks.acquire(&pid).await;

        let existing = self.repo.get_package(&pid).await?;
        let project = self.repo.get_project(&pid).await?;
        let changes = prepare_lgset_changes(&existing, &input_pkg.layer_group_sets, &self.config.name_rules)?;

        tracing::info!(
            project = %pid,
            added = changes.added.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "processing layer group set changes"
        );

        if !changes.deleted.is_empty() {
            self.switch_up_deleted_set_references(&project, &changes.deleted, &changes.golden_id)
                .await?;
        }

        let mut pkg = existing.clone();
        pkg.layer_group_sets = changes.final_sets;
        let saved = self.repo.replace_package(&pkg).await?;

        let before = layer_groups_by_id(&existing.layer_group_sets);
        let after = layer_groups_by_id(&saved.layer_group_sets);
        let added: Vec<LayerGroup> = after
            .iter()
            .filter(|(id, _)| !before.contains_key(*id))
            .map(|(_, lg)| (*lg).clone())
            .collect();
        let removed: Vec<LayerGroup> = before
            .iter()
            .filter(|(id, _)| !after.contains_key(*id))
            .map(|(_, lg)| (*lg).clone())
            .collect();

        if !added.is_empty() {
            self.constraints
                .assess_layer_group_action(&pid, LayerGroupAction::Addition, &added)
                .await?;
        }
        if !removed.is_empty() {
            self.constraints
                .assess_layer_group_action(&pid, LayerGroupAction::Removal, &removed)
                .await?;
        }
        self.constraints.push_default_constraints(&pid).await?;

        Ok(saved)
    }

    /// Re-point netclasses and clearance relations that use a deleted set
    /// to the golden set, once per linkage group.
    async fn switch_up_deleted_set_references(
        &self,
        project: &Project,
        deleted: &[LayerGroupSet],
        golden_id: &str,
    ) -> Result<(), LayerGroupError> {
        let doomed: HashSet<&str> = deleted.iter().map(|s| s.id.as_str()).collect();

        let netclasses = self.repo.get_netclasses(&project.id).await?;
        let referencing_nc = netclasses
            .iter()
            .filter(|nc| doomed.contains(nc.layer_group_set_id.as_str()))
            .map(|nc| nc.id.as_str());
        let nc_targets = one_per_linkage_group(referencing_nc, &project.physical_links);

        let relations = self.repo.get_clearance_relations(&project.id).await?;
        let referencing_crb = relations
            .iter()
            .filter(|crb| doomed.contains(crb.value.as_str()))
            .map(|crb| crb.id.as_str());
        let crb_targets = one_per_linkage_group(referencing_crb, &project.clearance_links);

        for element_id in nc_targets.into_iter().chain(crb_targets) {
            tracing::debug!(project = %project.id, element = element_id, "switching element to golden set");
            self.linkage
                .switch_up_layer_group_set(&project.id, element_id, golden_id)
                .await?;
        }
        Ok(())
    }
}

/// Keep the first element of each linkage group, plus every unlinked one.
fn one_per_linkage_group<'a>(
    elements: impl Iterator<Item = &'a str>,
    links: &[crate::model::LinkageGroup],
) -> Vec<&'a str> {
    let mut seen_links = HashSet::new();
    elements
        .filter(|&element| {
            match links.iter().find(|g| g.element_ids.iter().any(|e| e == element)) {
                Some(group) => seen_links.insert(group.id.clone()),
                None => true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Layer, LinkageGroup};

    fn group(id: &str, name: &str, layers: &[&str]) -> LayerGroup {
        LayerGroup {
            id: id.into(),
            name: name.into(),
            is_active: true,
            layers: layers.iter().map(|&l| Layer::new(l)).collect(),
            tags: vec![],
        }
    }

    fn set(id: &str, name: &str, golden: bool, groups: Vec<LayerGroup>) -> LayerGroupSet {
        LayerGroupSet {
            id: id.into(),
            name: name.into(),
            is_golden: golden,
            layer_groups: groups,
            is_physical_default: golden,
            is_clearance_default: golden,
            tags: vec![],
        }
    }

    fn package() -> PackageLayout {
        PackageLayout {
            id: "pkg".into(),
            project_id: "p1".into(),
            stackup_layers: vec![],
            layer_group_sets: vec![
                set("g", "Golden", true, vec![group("a", "A", &["L2", "L7"]), group("b", "B", &["L4"])]),
                set("c1", "Custom", false, vec![group("a", "A", &["L2", "L7"]), group("b", "B", &["L4"])]),
            ],
            rule_areas: vec![],
        }
    }

    #[test]
    fn omitted_golden_survives_and_customs_are_deleted() {
        let pkg = package();
        let changes = prepare_lgset_changes(&pkg, &[], &NameRules::default()).unwrap();
        assert_eq!(changes.deleted.len(), 1);
        assert_eq!(changes.deleted[0].id, "c1");
        assert_eq!(changes.final_sets.len(), 1);
        assert!(changes.final_sets[0].is_golden);
    }

    #[test]
    fn added_set_gets_id_and_loses_marker() {
        let pkg = package();
        let mut new_set = set("", "Fresh", false, vec![group("b", "B", &["L4"])]);
        new_set.tags.push(tags::ADDED_LGSET.into());
        let incoming = vec![pkg.layer_group_sets[0].clone(), pkg.layer_group_sets[1].clone(), new_set];
        let changes = prepare_lgset_changes(&pkg, &incoming, &NameRules::default()).unwrap();
        let added = &changes.added[0];
        assert!(!added.id.is_empty());
        assert!(added.tags.is_empty());
        assert_eq!(changes.final_sets.len(), 3);
    }

    #[test]
    fn added_set_cannot_invent_layer_groups() {
        let pkg = package();
        let new_set = set("", "Fresh", false, vec![group("zz", "Z", &["L4"])]);
        let err = prepare_lgset_changes(&pkg, &[new_set], &NameRules::default()).unwrap_err();
        assert!(matches!(err, LayerGroupError::UnknownLayerGroupReference { .. }));
    }

    #[test]
    fn added_name_clashing_with_existing_is_rejected() {
        let pkg = package();
        let new_set = set("", "custom", false, vec![group("a", "A", &["L2", "L7"])]);
        let err = prepare_lgset_changes(&pkg, &[new_set], &NameRules::default()).unwrap_err();
        assert!(matches!(err, LayerGroupError::DuplicateNames { .. }), "{err}");
    }

    #[test]
    fn removing_a_group_requires_redistribution() {
        let pkg = package();
        // Drop B from the custom set without moving L4 anywhere.
        let edited = set("c1", "Custom", false, vec![group("a", "A", &["L2", "L7"])]);
        let err = prepare_lgset_changes(&pkg, &[edited], &NameRules::default()).unwrap_err();
        match err {
            LayerGroupError::UnassignedLayers { layer_group, layers, .. } => {
                assert_eq!(layer_group, "B");
                assert_eq!(layers, vec!["L4".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Moving L4 into A makes the same removal legal.
        let edited = set("c1", "Custom", false, vec![group("a", "A", &["L2", "L7", "L4"])]);
        assert!(prepare_lgset_changes(&pkg, &[edited], &NameRules::default()).is_ok());
    }

    #[test]
    fn new_group_in_update_gets_id() {
        let pkg = package();
        let edited = set(
            "c1",
            "Custom",
            false,
            vec![group("a", "A", &["L2"]), group("", "A7", &["L7"]), group("b", "B", &["L4"])],
        );
        let changes = prepare_lgset_changes(&pkg, &[edited], &NameRules::default()).unwrap();
        let lg = &changes.updated[0].layer_groups[1];
        assert!(!lg.id.is_empty());
    }

    #[test]
    fn layer_in_two_groups_is_rejected() {
        let pkg = package();
        let edited = set("c1", "Custom", false, vec![group("a", "A", &["L2", "L7"]), group("b", "B", &["L4", "L7"])]);
        let err = prepare_lgset_changes(&pkg, &[edited], &NameRules::default()).unwrap_err();
        assert!(matches!(err, LayerGroupError::LayerInMultipleGroups { .. }));
    }

    #[test]
    fn golden_flag_cannot_be_changed_by_update() {
        let pkg = package();
        let mut edited = pkg.layer_group_sets[1].clone();
        edited.is_golden = true;
        let changes = prepare_lgset_changes(&pkg, &[edited], &NameRules::default()).unwrap();
        assert!(!changes.updated[0].is_golden);
    }

    #[test]
    fn unknown_id_is_rejected() {
        let pkg = package();
        let ghost = set("nope", "Ghost", false, vec![]);
        assert!(matches!(
            prepare_lgset_changes(&pkg, &[ghost], &NameRules::default()),
            Err(LayerGroupError::UnknownLayerGroupSet { .. })
        ));
    }

    #[test]
    fn linkage_groups_collapse_to_one_representative() {
        let links = vec![LinkageGroup {
            id: "link".into(),
            name: "DDR".into(),
            element_ids: vec!["n1".into(), "n2".into()],
        }];
        let picked = one_per_linkage_group(["n1", "n2", "n3"].into_iter(), &links);
        assert_eq!(picked, vec!["n1", "n3"]);
    }
}
