//! Stackup edits driven end to end through the engine and the in-memory
//! collaborators.

mod common;

use common::*;
use stackgroup::{
    InMemoryStore, LayerGroupAction, LayerGroupEngine, LayerGroupError, LayerGroupSet, PackageLayout, ServiceCall,
    StackupConfig,
};
use std::sync::Arc;

fn names(set: &LayerGroupSet) -> Vec<&str> {
    set.layer_groups.iter().map(|g| g.name.as_str()).collect()
}

#[tokio::test]
async fn newly_routed_layer_is_assessed_as_addition() {
    let fx = seeded(vec![]);
    let mut pkg = fx.package();
    let mut stack = symmetric_stack();
    stack.push(metal("L8", 8, 5.0));
    stack.push(dielectric("D9", 9, 10.0));

    let sets = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&stack, &mut pkg, &fx.project, false, false)
        .await
        .unwrap();

    let golden = &sets[0];
    assert!(golden.is_golden);
    assert_eq!(golden.id, fx.golden_id, "the golden set keeps its identity");
    assert_eq!(
        names(golden),
        vec!["STRIPLINE_10_5_10", "STRIPLINE_10_5_20", "STRIPLINE_20_3_20"]
    );

    let assessments = fx.store.assessments();
    assert_eq!(
        assessments.last(),
        Some(&(LayerGroupAction::Addition, vec!["STRIPLINE_10_5_10".to_string()]))
    );
    let removals = assessments
        .iter()
        .filter(|(action, _)| *action == LayerGroupAction::Removal)
        .count();
    assert_eq!(removals, 2, "each old golden group is retired once");

    let calls = fx.store.calls();
    assert!(matches!(calls.first(), Some(ServiceCall::Snapshot { .. })));
    assert!(calls.contains(&ServiceCall::ReplacePackage));
    assert_eq!(calls[calls.len() - 2..], [ServiceCall::PushDefaults, ServiceCall::SortSlots]);

    // The custom set survived and now points at the new golden ids.
    let custom = sets.iter().find(|s| s.id == fx.custom_id).expect("custom set kept");
    for lg in &custom.layer_groups {
        assert!(golden.layer_groups.iter().any(|g| g.id == lg.id), "{} re-pointed", lg.name);
    }
    assert_eq!(fx.netclass_set("nc-custom"), fx.custom_id);

    assert_eq!(fx.package(), pkg, "the caller's package matches what was stored");
    assert_eq!(pkg.stackup_layers.len(), 9);
}

#[tokio::test]
async fn split_drops_custom_set_and_repairs_references() {
    let fx = seeded(vec![]);
    let mut pkg = fx.package();
    let mut stack = symmetric_stack();
    // L6 no longer mirrors L2.
    stack[5].thickness = 6.0;

    let sets = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&stack, &mut pkg, &fx.project, false, false)
        .await
        .unwrap();

    assert_eq!(sets.len(), 1, "the custom set spanned the split and is gone");
    assert_eq!(
        names(&sets[0]),
        vec!["STRIPLINE_10_5_20", "STRIPLINE_20_3_20", "STRIPLINE_20_6_10"]
    );

    // Constraints of the old mirrored group are copied onto both halves.
    let copied = fx.store.calls().into_iter().find_map(|c| match c {
        ServiceCall::CopyConstraints { from, to, .. } if from == "STRIPLINE_10_5_20" => Some(to),
        _ => None,
    });
    assert_eq!(
        copied,
        Some(vec!["STRIPLINE_10_5_20".to_string(), "STRIPLINE_20_6_10".to_string()])
    );

    // Nothing may keep pointing at the dropped set.
    assert_eq!(fx.netclass_set("nc-golden"), fx.golden_id);
    assert_eq!(fx.netclass_set("nc-custom"), fx.golden_id);
    assert_eq!(fx.netclass_set("nc-custom-2"), fx.golden_id);
    assert_eq!(fx.store.clearance_relations(PROJECT)[0].value, fx.golden_id);
}

#[tokio::test]
async fn losing_every_routing_layer_is_refused_without_side_effects() {
    let fx = seeded(vec![]);
    let before = fx.package();
    let mut pkg = before.clone();

    let err = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&unrouted_stack(), &mut pkg, &fx.project, false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, LayerGroupError::NoRoutableLayers { existing: 2 }), "{err}");
    assert_eq!(pkg, before);
    assert_eq!(fx.package(), before);
    assert!(fx.store.calls().is_empty(), "not even a snapshot: {:?}", fx.store.calls());
}

#[tokio::test]
async fn no_routing_before_or_after_is_a_no_op() {
    let store = Arc::new(InMemoryStore::new());
    let package = PackageLayout {
        id: "pkg-1".into(),
        project_id: PROJECT.into(),
        stackup_layers: unrouted_stack(),
        layer_group_sets: vec![],
        rule_areas: vec![],
    };
    store.seed(project(), package.clone(), vec![], vec![]);
    let engine = LayerGroupEngine::with_store(store.clone(), StackupConfig::default());

    let mut pkg = package.clone();
    let mut stack = unrouted_stack();
    stack[1].thickness = 7.0;
    let sets = engine
        .evaluate_lgsets_for_stackup_change(&stack, &mut pkg, &project(), false, false)
        .await
        .unwrap();

    assert!(sets.is_empty());
    assert_eq!(pkg, package, "the edit is not applied by this path");
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn first_routing_layers_install_a_golden_set() {
    let store = Arc::new(InMemoryStore::new());
    let package = PackageLayout {
        id: "pkg-1".into(),
        project_id: PROJECT.into(),
        stackup_layers: unrouted_stack(),
        layer_group_sets: vec![LayerGroupSet::golden("Golden", vec![])],
        rule_areas: vec![],
    };
    store.seed(project(), package.clone(), vec![], vec![]);
    let engine = LayerGroupEngine::with_store(store.clone(), StackupConfig::default());

    let mut pkg = package.clone();
    let sets = engine
        .evaluate_lgsets_for_stackup_change(&symmetric_stack(), &mut pkg, &project(), false, false)
        .await
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].id, package.layer_group_sets[0].id, "filled in place");
    assert_eq!(names(&sets[0]), vec!["STRIPLINE_10_5_20", "STRIPLINE_20_3_20"]);
    assert_eq!(
        store.assessments(),
        vec![(
            LayerGroupAction::Addition,
            vec!["STRIPLINE_10_5_20".to_string(), "STRIPLINE_20_3_20".to_string()]
        )]
    );
    assert_eq!(store.package(PROJECT), Some(pkg));
}

#[tokio::test]
async fn freshest_replaces_all_sets_and_repoints_references() {
    let fx = seeded(vec![]);
    let mut pkg = fx.package();

    let sets = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&symmetric_stack(), &mut pkg, &fx.project, true, true)
        .await
        .unwrap();

    assert_eq!(sets.len(), 1);
    assert!(sets[0].is_golden);
    let fresh_id = &sets[0].id;
    assert_ne!(fresh_id, &fx.golden_id, "a brand-new golden set");
    assert_eq!(pkg.layer_group_sets, sets);

    for nc in ["nc-golden", "nc-custom", "nc-custom-2"] {
        assert_eq!(&fx.netclass_set(nc), fresh_id, "{nc} points at the fresh set");
    }
    assert_eq!(&fx.store.clearance_relations(PROJECT)[0].value, fresh_id);

    // References are the only documents touched.
    assert_eq!(
        fx.store.calls(),
        vec![
            ServiceCall::ReplaceNetclasses { count: 3 },
            ServiceCall::ReplaceClearanceRelations { count: 1 },
        ]
    );
}

#[tokio::test]
async fn custom_sets_without_golden_are_refused_before_the_snapshot() {
    let fx = seeded(vec![]);
    let mut pkg = fx.package();
    pkg.layer_group_sets.retain(|s| !s.is_golden);
    let before = pkg.clone();

    let err = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&symmetric_stack(), &mut pkg, &fx.project, false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, LayerGroupError::MissingGoldenSet { .. }), "{err}");
    assert_eq!(pkg, before);
    assert!(fx.store.calls().is_empty(), "{:?}", fx.store.calls());
}

#[tokio::test]
async fn custom_group_absorbing_a_removed_group_survives_an_unrelated_edit() {
    let fx = seeded(vec![]);

    // The custom set keeps one group under the mirrored group's id that
    // also carries L4, the layer of the golden set's second group.
    let mut seeded_pkg = fx.package();
    let custom = &mut seeded_pkg.layer_group_sets[1];
    custom.layer_groups.truncate(1);
    custom.layer_groups[0].layers.push(stackgroup::Layer::new("L4"));
    let custom_group_id = custom.layer_groups[0].id.clone();
    fx.store.seed(
        fx.project.clone(),
        seeded_pkg.clone(),
        fx.store.netclasses(PROJECT),
        fx.store.clearance_relations(PROJECT),
    );

    let mut pkg = seeded_pkg;
    let mut stack = symmetric_stack();
    stack[2].material = "Megtron6".into();

    let sets = fx
        .engine
        .evaluate_lgsets_for_stackup_change(&stack, &mut pkg, &fx.project, false, false)
        .await
        .unwrap();

    assert_eq!(sets.len(), 2, "the custom set is kept");
    let custom = &sets[1];
    assert_eq!(custom.id, fx.custom_id);
    let golden_mirrored = sets[0]
        .layer_groups
        .iter()
        .find(|g| g.name == "STRIPLINE_10_5_20")
        .expect("mirrored group");
    assert_ne!(golden_mirrored.id, custom_group_id, "ids are regenerated");
    assert_eq!(custom.layer_groups[0].id, golden_mirrored.id);
    let layers: Vec<&str> = custom.layer_groups[0].layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(layers, vec!["L2", "L6", "L4"]);
    assert_eq!(fx.netclass_set("nc-custom"), fx.custom_id);
}

#[tokio::test]
async fn handle_stackup_shakeup_requires_a_golden_set() {
    let fx = seeded(vec![]);
    let mut pkg = fx.package();
    pkg.layer_group_sets.retain(|s| !s.is_golden);
    let incoming = fx.package().layer_group_sets[0].layer_groups.clone();

    let err = fx
        .engine
        .handle_stackup_shakeup(&mut pkg, &fx.project, incoming)
        .await
        .unwrap_err();
    assert!(matches!(err, LayerGroupError::CannotReassess));
    assert!(fx.store.calls().is_empty());
}
