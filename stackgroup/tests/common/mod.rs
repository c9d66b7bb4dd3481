//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use stackgroup::{
    generate_layer_groups, ClearanceRelationBrand, InMemoryStore, LayerGroupEngine, LayerGroupSet, LayerSide,
    LinkageGroup, Netclass, PackageLayout, Project, RoutingLayerType, StackupConfig, StackupLayer, StackupLayerType,
};

pub const PROJECT: &str = "p1";

pub fn dielectric(name: &str, index: u32, thickness: f64) -> StackupLayer {
    StackupLayer {
        name: name.into(),
        index,
        layer_type: StackupLayerType::Dielectric,
        routing_layer_type: RoutingLayerType::None,
        thickness,
        side: LayerSide::Neither,
        material: "FR4".into(),
    }
}

pub fn metal(name: &str, index: u32, thickness: f64) -> StackupLayer {
    StackupLayer {
        name: name.into(),
        index,
        layer_type: StackupLayerType::Metal,
        routing_layer_type: RoutingLayerType::Signal,
        thickness,
        side: LayerSide::Neither,
        material: "Copper".into(),
    }
}

/// L2/L6 mirror each other around L4.
pub fn symmetric_stack() -> Vec<StackupLayer> {
    vec![
        dielectric("D1", 1, 10.0),
        metal("L2", 2, 5.0),
        dielectric("D3", 3, 20.0),
        metal("L4", 4, 3.0),
        dielectric("D5", 5, 20.0),
        metal("L6", 6, 5.0),
        dielectric("D7", 7, 10.0),
    ]
}

/// The symmetric stack with the same layers but no routing selected.
pub fn unrouted_stack() -> Vec<StackupLayer> {
    symmetric_stack()
        .into_iter()
        .map(|l| StackupLayer {
            routing_layer_type: RoutingLayerType::None,
            ..l
        })
        .collect()
}

pub fn project() -> Project {
    Project {
        id: PROJECT.into(),
        name: "Package A".into(),
        physical_links: vec![],
        clearance_links: vec![],
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub engine: LayerGroupEngine,
    pub project: Project,
    pub golden_id: String,
    pub custom_id: String,
}

impl Fixture {
    pub fn package(&self) -> PackageLayout {
        self.store.package(PROJECT).expect("seeded package")
    }

    pub fn netclass_set(&self, id: &str) -> String {
        self.store
            .netclasses(PROJECT)
            .into_iter()
            .find(|n| n.id == id)
            .map(|n| n.layer_group_set_id)
            .expect("netclass exists")
    }
}

/// A project on [`symmetric_stack`] with its golden set, one custom set
/// mirroring the golden grouping, and references into both.
pub fn seeded(physical_links: Vec<LinkageGroup>) -> Fixture {
    let config = StackupConfig::default();
    let project = Project {
        physical_links,
        ..project()
    };
    let stack = symmetric_stack();
    let groups = generate_layer_groups(&project, &stack, false, &config).expect("generation");
    let golden = LayerGroupSet::golden("Golden", groups.clone());
    let custom = LayerGroupSet {
        id: "custom-1".into(),
        name: "HighSpeed".into(),
        is_golden: false,
        layer_groups: groups,
        is_physical_default: false,
        is_clearance_default: false,
        tags: vec![],
    };

    let netclass = |id: &str, set: &str| Netclass {
        id: id.into(),
        name: id.to_uppercase(),
        interface_id: "if-1".into(),
        layer_group_set_id: set.into(),
    };
    let netclasses = vec![
        netclass("nc-golden", &golden.id),
        netclass("nc-custom", &custom.id),
        netclass("nc-custom-2", &custom.id),
    ];
    let relations = vec![ClearanceRelationBrand {
        id: "crb-1".into(),
        name: "DDR spacing".into(),
        interface_id: "if-1".into(),
        value: custom.id.clone(),
    }];

    let package = PackageLayout {
        id: "pkg-1".into(),
        project_id: PROJECT.into(),
        stackup_layers: stack,
        layer_group_sets: vec![golden.clone(), custom.clone()],
        rule_areas: vec![],
    };

    let store = Arc::new(InMemoryStore::new());
    store.seed(project.clone(), package, netclasses, relations);
    let engine = LayerGroupEngine::with_store(store.clone(), config);

    Fixture {
        store,
        engine,
        project,
        golden_id: golden.id,
        custom_id: custom.id,
    }
}
