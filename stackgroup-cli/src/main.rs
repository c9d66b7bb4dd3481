//! stackgroup CLI
//!
//! Generate layer groups from a stackup and apply stackup or layer-group
//! set edits to a project bundle.
//!
//! # Usage
//!
//! ```bash
//! # Print the layer groups a stackup yields
//! stackgroup generate --stackup stackup.yaml
//!
//! # Apply a stackup edit to a project and save the result
//! stackgroup shakeup --bundle project.json --stackup stackup.yaml --out project.json
//!
//! # Submit edited layer-group sets
//! stackgroup apply-sets --bundle project.json --sets sets.json --out project.json
//!
//! # Write the default config
//! stackgroup init
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use stackgroup::StackupConfig;
use stackgroup_cli::bundle::{load_sets, load_stackup, ProjectBundle};
use stackgroup_cli::runner::{self, RunOutcome, ShakeupOptions};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackgroup")]
#[command(about = "Layer group generation and maintenance for PCB package stackups")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to stackgroup config YAML
    #[arg(short, long, global = true, default_value = "stackgroup.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate layer groups for a stackup
    Generate {
        /// Stackup YAML (a list of layers)
        #[arg(short, long)]
        stackup: PathBuf,

        /// Split microstrip groups by package side
        #[arg(long)]
        split_sides: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Apply a stackup edit to a project bundle
    Shakeup {
        /// Project bundle JSON
        #[arg(short, long)]
        bundle: PathBuf,

        /// New stackup YAML
        #[arg(short, long)]
        stackup: PathBuf,

        /// Replace every layer group set with a fresh golden set
        #[arg(long)]
        fresh: bool,

        /// Split microstrip groups by package side
        #[arg(long)]
        split_sides: bool,

        /// Where to write the updated bundle
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output JSON report path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Submit added, updated and removed layer group sets
    ApplySets {
        /// Project bundle JSON
        #[arg(short, long)]
        bundle: PathBuf,

        /// JSON list of layer group sets
        #[arg(long)]
        sets: PathBuf,

        /// Where to write the updated bundle
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output JSON report path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Write the default config
    Init {
        #[arg(long, default_value = "stackgroup.yaml")]
        path: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stackgroup=info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => init_config(path)?,
        Commands::Generate {
            stackup,
            split_sides,
            json,
        } => {
            let config = load_config(&cli.config)?;
            generate(stackup, *split_sides, *json, &config)?;
        }
        Commands::Shakeup {
            bundle,
            stackup,
            fresh,
            split_sides,
            out,
            report,
        } => {
            let config = load_config(&cli.config)?;
            let options = ShakeupOptions {
                split_sides: *split_sides,
                fresh: *fresh,
            };
            let outcome = runner::run_shakeup(ProjectBundle::load(bundle)?, &load_stackup(stackup)?, options, config).await?;
            finish(outcome, out.as_deref(), report.as_deref())?;
        }
        Commands::ApplySets {
            bundle,
            sets,
            out,
            report,
        } => {
            let config = load_config(&cli.config)?;
            let outcome = runner::run_apply_sets(ProjectBundle::load(bundle)?, load_sets(sets)?, config).await?;
            finish(outcome, out.as_deref(), report.as_deref())?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<StackupConfig> {
    if path.exists() {
        Ok(StackupConfig::load(path)?)
    } else {
        println!("  {} Config not found, using defaults", "⚠".yellow());
        Ok(StackupConfig::default())
    }
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("{} {} already exists, leaving it alone", "⚠".yellow(), path.display());
        return Ok(());
    }
    std::fs::write(path, StackupConfig::default().to_yaml()?)?;
    println!("{} Wrote default config to {}", "✓".green(), path.display());
    Ok(())
}

fn generate(stackup: &Path, split_sides: bool, json: bool, config: &StackupConfig) -> anyhow::Result<()> {
    let layers = load_stackup(stackup)?;
    let project_id = stackup
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stackup".to_string());
    let groups = runner::run_generate(&project_id, &layers, split_sides, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    if groups.is_empty() {
        println!("{} No groupable routing layers", "⚠".yellow());
        return Ok(());
    }
    for group in &groups {
        let layers: Vec<&str> = group.layers.iter().map(|l| l.name.as_str()).collect();
        println!("{:<32} {}", group.name.bold(), layers.join(", "));
    }
    Ok(())
}

fn finish(outcome: RunOutcome, out: Option<&Path>, report: Option<&Path>) -> anyhow::Result<()> {
    outcome.report.print_summary();
    if let Some(path) = report {
        outcome.report.save_json(path)?;
        println!("{} Report saved to {}", "✓".green(), path.display());
    }
    if let Some(path) = out {
        outcome.bundle.save(path)?;
        println!("{} Bundle saved to {}", "✓".green(), path.display());
    }
    Ok(())
}
