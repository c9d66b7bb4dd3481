//! Run reports: what an engine operation did to a project.
//!
//! A [`RunReport`] is assembled from the calls recorded by the in-memory
//! store plus a before/after comparison of the bundle, then printed with
//! colors or saved as JSON.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stackgroup::{LayerGroupAction, ServiceCall};

use crate::bundle::ProjectBundle;
use crate::CliError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub action: LayerGroupAction,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCopy {
    pub from: String,
    pub to: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub operation: String,
    pub project_id: String,
    pub snapshot_taken: bool,
    /// `(set name, layer group names)` after the run, golden first.
    pub layer_group_sets: Vec<(String, Vec<String>)>,
    pub assessments: Vec<Assessment>,
    pub copies: Vec<ConstraintCopy>,
    /// Golden layer groups retired without handing their constraints on.
    pub dissolved_groups: Vec<String>,
    /// Sets present before the run and gone after it.
    pub removed_sets: Vec<String>,
    pub switch_ups: Vec<String>,
    /// Netclasses whose layer-group set changed.
    pub repointed_netclasses: Vec<String>,
    /// Clearance relations whose layer-group set changed.
    pub repointed_clearance_relations: Vec<String>,
}

impl RunReport {
    pub fn new(operation: &str, calls: &[ServiceCall], before: &ProjectBundle, after: &ProjectBundle) -> Self {
        let mut report = Self {
            operation: operation.to_string(),
            project_id: after.project.id.clone(),
            snapshot_taken: false,
            layer_group_sets: after
                .package
                .layer_group_sets
                .iter()
                .map(|s| (s.name.clone(), s.layer_groups.iter().map(|lg| lg.name.clone()).collect()))
                .collect(),
            assessments: Vec::new(),
            copies: Vec::new(),
            dissolved_groups: Vec::new(),
            removed_sets: Vec::new(),
            switch_ups: Vec::new(),
            repointed_netclasses: Vec::new(),
            repointed_clearance_relations: Vec::new(),
        };

        for call in calls {
            match call {
                ServiceCall::Snapshot { .. } => report.snapshot_taken = true,
                ServiceCall::Assess { action, group_names, .. } => report.assessments.push(Assessment {
                    action: *action,
                    groups: group_names.clone(),
                }),
                ServiceCall::CopyConstraints { from, to, .. } => report.copies.push(ConstraintCopy {
                    from: from.clone(),
                    to: to.clone(),
                }),
                ServiceCall::SwitchUp { element_id, .. } => report.switch_ups.push(element_id.clone()),
                _ => {}
            }
        }

        // During a shakeup every surviving golden group is copied from
        // before it is retired; a retirement without a copy lost its data.
        if report.snapshot_taken {
            let copied: HashSet<&str> = report.copies.iter().map(|c| c.from.as_str()).collect();
            report.dissolved_groups = report
                .assessments
                .iter()
                .filter(|a| a.action == LayerGroupAction::Removal)
                .flat_map(|a| a.groups.iter())
                .filter(|name| !copied.contains(name.as_str()))
                .cloned()
                .collect();
        }

        let after_sets: HashSet<&str> = after.package.layer_group_sets.iter().map(|s| s.id.as_str()).collect();
        report.removed_sets = before
            .package
            .layer_group_sets
            .iter()
            .filter(|s| !after_sets.contains(s.id.as_str()))
            .map(|s| s.name.clone())
            .collect();

        report.repointed_netclasses = after
            .netclasses
            .iter()
            .filter(|nc| {
                before
                    .netclasses
                    .iter()
                    .any(|old| old.id == nc.id && old.layer_group_set_id != nc.layer_group_set_id)
            })
            .map(|nc| nc.name.clone())
            .collect();
        report.repointed_clearance_relations = after
            .clearance_relations
            .iter()
            .filter(|crb| {
                before
                    .clearance_relations
                    .iter()
                    .any(|old| old.id == crb.id && old.value != crb.value)
            })
            .map(|crb| crb.name.clone())
            .collect();

        report
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), CliError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Print human-readable summary to terminal.
    pub fn print_summary(&self) {
        use colored::Colorize;

        println!("\n{}", "═".repeat(60).bold());
        println!("{}", format!(" STACKGROUP {} ", self.operation.to_uppercase()).bold().on_blue());
        println!("{}", "═".repeat(60).bold());
        println!("Project:  {}", self.project_id.dimmed());
        if self.snapshot_taken {
            println!("Snapshot: {}", "taken".green());
        }
        println!();

        for (set, groups) in &self.layer_group_sets {
            println!("{} ({} groups)", set.bold(), groups.len());
            for group in groups {
                println!("  {} {}", "•".blue(), group);
            }
        }
        println!();

        for a in &self.assessments {
            let label = match a.action {
                LayerGroupAction::Addition => "ADD".green().bold(),
                LayerGroupAction::Removal => "DEL".red().bold(),
            };
            println!("[{}] {}", label, a.groups.join(", "));
        }
        for c in &self.copies {
            println!("  {} {} → {}", "⇢".cyan(), c.from, c.to.join(", "));
        }

        for group in &self.dissolved_groups {
            println!("  {} layer group {} dissolved, its constraints were dropped", "⚠".yellow(), group.bold());
        }
        for set in &self.removed_sets {
            println!("  {} layer group set {} removed", "⚠".yellow(), set.bold());
        }
        for element in &self.switch_ups {
            println!("  {} switched {} to the golden set", "↺".cyan(), element);
        }
        if !self.repointed_netclasses.is_empty() {
            println!("Repointed netclasses: {}", self.repointed_netclasses.join(", "));
        }
        if !self.repointed_clearance_relations.is_empty() {
            println!(
                "Repointed clearance relations: {}",
                self.repointed_clearance_relations.join(", ")
            );
        }

        println!("{}\n", "═".repeat(60).bold());
    }
}
