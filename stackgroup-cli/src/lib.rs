//! # stackgroup CLI library
//!
//! File-driven front end for the `stackgroup` engine. A project's documents
//! travel as one JSON [`bundle::ProjectBundle`]; stackups are YAML lists of
//! layers. Each run loads the bundle into an in-memory store, drives the
//! engine against it, and reports every collaborator call it made.
//!
//! ```rust,ignore
//! use stackgroup_cli::{bundle, runner};
//!
//! let bundle = bundle::ProjectBundle::load("project.json")?;
//! let stackup = bundle::load_stackup("stackup.yaml")?;
//! let outcome = runner::run_shakeup(bundle, &stackup, runner::ShakeupOptions::default(), config).await?;
//! outcome.report.print_summary();
//! outcome.bundle.save("project.json")?;
//! ```

pub mod bundle;
pub mod report;
pub mod runner;

use stackgroup::config::ConfigError;
use stackgroup::LayerGroupError;
use thiserror::Error;

pub use bundle::ProjectBundle;
pub use report::RunReport;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    LayerGroup(#[from] LayerGroupError),
}
