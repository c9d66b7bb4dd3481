//! Layer-group management for PCB package stackups.
//!
//! Layer groups bundle the routing layers of a stackup that behave alike
//! electrically, so routing constraints can be authored once per group
//! instead of once per layer. This crate derives those groups from a
//! stackup and keeps a package's layer-group sets consistent when the
//! stackup or the sets themselves change.
//!
//! # Pipeline
//!
//! ```text
//! StackupLayer[]
//!   → classify   (which metal layers can be grouped at all)
//!   → generate   (cluster by dielectric neighbourhood, name, split sides)
//!   → shakeup    (map old groups to new ones, rewrite custom sets)
//!   → engine     (snapshot, constraint assessment, persistence)
//! ```
//!
//! Explicit edits to layer-group sets go through [`lgset`].

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod generate;
pub mod lgset;
pub mod locks;
pub mod memory;
pub mod model;
pub mod naming;
pub mod services;
pub mod shakeup;

pub use config::{NameRules, NamingStrategy, NamingStrategyKind, StackupConfig};
pub use engine::LayerGroupEngine;
pub use error::{LayerGroupError, ServiceError};
pub use generate::generate_layer_groups;
pub use lgset::{prepare_lgset_changes, LgSetChanges};
pub use memory::{InMemoryStore, ServiceCall};
pub use model::{
    ClearanceRelationBrand, Layer, LayerGroup, LayerGroupAction, LayerGroupSet, LayerSide, LinkageGroup, Netclass,
    PackageLayout, Project, RoutingLayerType, RuleArea, StackupLayer, StackupLayerType,
};
pub use shakeup::{plan_shakeup, Correspondence, MatchKind, ShakeupPlan};
