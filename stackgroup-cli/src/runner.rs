//! Drive the engine against a loaded bundle.

use stackgroup::{
    generate_layer_groups, LayerGroup, LayerGroupEngine, LayerGroupSet, PackageLayout, Project, StackupConfig,
    StackupLayer,
};

use crate::bundle::ProjectBundle;
use crate::report::RunReport;
use crate::CliError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShakeupOptions {
    /// Split microstrip groups into front and back side groups.
    pub split_sides: bool,
    /// Discard every existing set and install a fresh golden set.
    pub fresh: bool,
}

/// Result of a run: the updated documents and what happened to them.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub bundle: ProjectBundle,
    pub report: RunReport,
}

/// Generate layer groups for a standalone stackup.
pub fn run_generate(
    project_id: &str,
    stackup: &[StackupLayer],
    split_sides: bool,
    config: &StackupConfig,
) -> Result<Vec<LayerGroup>, CliError> {
    let project = Project {
        id: project_id.to_string(),
        name: project_id.to_string(),
        physical_links: Vec::new(),
        clearance_links: Vec::new(),
    };
    Ok(generate_layer_groups(&project, stackup, split_sides, config)?)
}

/// Apply `stackup` to the bundle's package and reconcile its layer-group sets.
pub async fn run_shakeup(
    bundle: ProjectBundle,
    stackup: &[StackupLayer],
    options: ShakeupOptions,
    config: StackupConfig,
) -> Result<RunOutcome, CliError> {
    let store = bundle.to_store();
    let engine = LayerGroupEngine::with_store(store.clone(), config);

    let mut package = bundle.package.clone();
    engine
        .evaluate_lgsets_for_stackup_change(stackup, &mut package, &bundle.project, options.split_sides, options.fresh)
        .await?;
    // The no-op and fresh paths leave the stackup edit to the caller.
    package.stackup_layers = stackup.to_vec();

    let updated = bundle.with_results(package, &store);
    let report = RunReport::new("shakeup", &store.calls(), &bundle, &updated);
    Ok(RunOutcome { bundle: updated, report })
}

/// Submit an edited collection of layer-group sets.
pub async fn run_apply_sets(
    bundle: ProjectBundle,
    sets: Vec<LayerGroupSet>,
    config: StackupConfig,
) -> Result<RunOutcome, CliError> {
    let store = bundle.to_store();
    let engine = LayerGroupEngine::with_store(store.clone(), config);

    let input = PackageLayout {
        layer_group_sets: sets,
        ..bundle.package.clone()
    };
    let saved = engine.process_lgset_changes(input).await?;

    let updated = bundle.with_results(saved, &store);
    let report = RunReport::new("apply-sets", &store.calls(), &bundle, &updated);
    Ok(RunOutcome { bundle: updated, report })
}
