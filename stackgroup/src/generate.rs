//! Layer group generation from a stackup.
//!
//! Routing layers are clustered by electrical symmetry: same thickness and
//! the same pair of neighbouring dielectric thicknesses, in either order.
//! Clusters are then split into microstrip/stripline groups (and optionally
//! front/back side groups) and named per the configured strategy.

use std::collections::HashSet;

use crate::classify::StackupIndex;
use crate::config::{NamingStrategy, NamingStrategyKind, StackupConfig};
use crate::error::LayerGroupError;
use crate::model::{new_id, tags, Layer, LayerGroup, LayerSide, Project, StackupLayer};

const STRIPLINE: &str = "STRIPLINE";
const MICROSTRIP: &str = "MICROSTRIP";
const BACK_SIDE_SUFFIX: &str = "_X";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StripKind {
    Stripline,
    Microstrip,
}

impl StripKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Stripline => STRIPLINE,
            Self::Microstrip => MICROSTRIP,
        }
    }
}

/// A group under construction, before ids and final names are assigned.
#[derive(Debug, Clone)]
struct Candidate<'a> {
    name: String,
    kind: StripKind,
    layers: Vec<&'a StackupLayer>,
}

/// Generate the layer groups for `stackup_layers`.
///
/// Returns an empty list when no layer qualifies. Fails only when the
/// output breaks name/id/layer uniqueness, which indicates a defect.
pub fn generate_layer_groups(
    project: &Project,
    stackup_layers: &[StackupLayer],
    perform_sep_fs_bs_grouping: bool,
    config: &StackupConfig,
) -> Result<Vec<LayerGroup>, LayerGroupError> {
    let mut sorted: Vec<&StackupLayer> = stackup_layers.iter().collect();
    sorted.sort_by_key(|l| l.index);

    let clusters = cluster_layers(stackup_layers, &sorted);
    let split = rename_and_split_layer_groups(clusters, perform_sep_fs_bs_grouping, config);
    let groups = apply_naming(split, &config.naming);

    verify_generated(&groups)?;

    tracing::info!(
        project = %project.id,
        groups = groups.len(),
        strategy = config.naming.kind.as_str(),
        "generated layer groups"
    );
    Ok(groups)
}

// ---------------------------------------------------------------------------
// Clustering
// ---------------------------------------------------------------------------

fn cluster_layers<'a>(all: &'a [StackupLayer], sorted: &[&'a StackupLayer]) -> Vec<Candidate<'a>> {
    let index = StackupIndex::new(all);
    let mut visited: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();

    let inner = sorted.len().saturating_sub(1);
    for (pos, &from) in sorted.iter().enumerate().take(inner).skip(1) {
        if visited.contains(from.name.as_str()) {
            continue;
        }
        let Some((before, after)) = index.neighbours(from) else {
            continue;
        };
        if !index.is_groupable(from) {
            continue;
        }

        visited.insert(&from.name);
        let mut cluster = Candidate {
            name: format!(
                "{STRIPLINE}_{}_{}_{}",
                fmt_thickness(before.thickness),
                fmt_thickness(from.thickness),
                fmt_thickness(after.thickness)
            ),
            kind: StripKind::Stripline,
            layers: vec![from],
        };

        for &to in sorted.iter().take(inner).skip(pos + 1) {
            if visited.contains(to.name.as_str()) || to.thickness != from.thickness {
                continue;
            }
            let Some((to_before, to_after)) = index.neighbours(to) else {
                continue;
            };
            if !index.is_groupable(to) {
                continue;
            }
            let same_order = to_before.thickness == before.thickness && to_after.thickness == after.thickness;
            let mirrored = to_before.thickness == after.thickness && to_after.thickness == before.thickness;
            if same_order || mirrored {
                visited.insert(&to.name);
                cluster.layers.push(to);
            }
        }

        if cluster.layers.is_empty() {
            continue;
        }
        tracing::debug!(group = %cluster.name, layers = cluster.layers.len(), "clustered layers");
        clusters.push(cluster);
    }

    clusters
}

fn fmt_thickness(t: f64) -> String {
    format!("{t}")
}

// ---------------------------------------------------------------------------
// Microstrip / side splitting
// ---------------------------------------------------------------------------

fn rename_and_split_layer_groups<'a>(
    clusters: Vec<Candidate<'a>>,
    perform_sep_fs_bs_grouping: bool,
    config: &StackupConfig,
) -> Vec<Candidate<'a>> {
    let mut out = Vec::with_capacity(clusters.len());

    for cluster in clusters {
        let (micro, rest): (Vec<&StackupLayer>, Vec<&StackupLayer>) = cluster
            .layers
            .iter()
            .copied()
            .partition(|l| config.is_microstrip_layer(&l.name));

        if rest.is_empty() {
            let whole = Candidate {
                name: cluster.name.replace(STRIPLINE, MICROSTRIP),
                kind: StripKind::Microstrip,
                layers: micro,
            };
            out.extend(consider_fs_bs_split_off(whole, perform_sep_fs_bs_grouping));
        } else if !micro.is_empty() {
            let split_off = Candidate {
                name: cluster.name.replace(STRIPLINE, MICROSTRIP),
                kind: StripKind::Microstrip,
                layers: micro,
            };
            out.extend(consider_fs_bs_split_off(split_off, perform_sep_fs_bs_grouping));
            out.push(Candidate { layers: rest, ..cluster });
        } else {
            out.push(cluster);
        }
    }

    out
}

/// Split a purely front/back group into a front group and a `_X` back group.
fn consider_fs_bs_split_off(group: Candidate<'_>, perform: bool) -> Vec<Candidate<'_>> {
    if !perform {
        return vec![group];
    }

    let mut front = Vec::new();
    let mut back = Vec::new();
    let mut other = 0usize;
    for &layer in &group.layers {
        match layer.side {
            LayerSide::Front => front.push(layer),
            LayerSide::Back => back.push(layer),
            LayerSide::Neither => other += 1,
        }
    }

    if other > 0 || front.is_empty() || back.is_empty() {
        return vec![group];
    }

    let back_group = Candidate {
        name: format!("{}{BACK_SIDE_SUFFIX}", group.name),
        kind: group.kind,
        layers: back,
    };
    vec![Candidate { layers: front, ..group }, back_group]
}

// ---------------------------------------------------------------------------
// Naming and final checks
// ---------------------------------------------------------------------------

fn apply_naming(candidates: Vec<Candidate<'_>>, naming: &NamingStrategy) -> Vec<LayerGroup> {
    let mut groups: Vec<LayerGroup> = Vec::with_capacity(candidates.len());
    for cand in candidates {
        let n = groups.len() + 1;
        let name = match naming.kind {
            NamingStrategyKind::StripWithThickness => cand.name,
            NamingStrategyKind::Strip => format!("{}_{n}", cand.kind.prefix()),
            NamingStrategyKind::Generic => format!("{}_{n}", naming.prefix),
        };
        groups.push(LayerGroup {
            id: new_id(),
            name,
            is_active: true,
            layers: cand.layers.iter().map(|l| Layer::new(l.name.clone())).collect(),
            tags: vec![tags::AUTO.to_string()],
        });
    }
    groups
}

/// Check that group names, group ids and layer memberships are unique.
pub(crate) fn verify_generated(groups: &[LayerGroup]) -> Result<(), LayerGroupError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    let mut layers = HashSet::new();

    for lg in groups {
        if !names.insert(lg.name.to_lowercase()) {
            return Err(LayerGroupError::GenerationInvariant(format!(
                "duplicate layer group name '{}'",
                lg.name
            )));
        }
        if !ids.insert(lg.id.as_str()) {
            return Err(LayerGroupError::GenerationInvariant(format!(
                "duplicate layer group id '{}'",
                lg.id
            )));
        }
        for layer in &lg.layers {
            if !layers.insert(layer.name.as_str()) {
                return Err(LayerGroupError::GenerationInvariant(format!(
                    "layer '{}' assigned to more than one group",
                    layer.name
                )));
            }
        }
    }
    Ok(())
}
