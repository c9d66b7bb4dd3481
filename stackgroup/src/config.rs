//! YAML-based configuration for layer-group generation.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock behaviour.
//!
//! ```yaml
//! naming:
//!   kind: STRIP_WITH_THICKNESS
//!   prefix: LG
//! microstrip_layer_names: [TOP, BOTTOM]
//! golden_set_name: Golden
//! name_rules:
//!   min_len: 2
//!   max_len: 48
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// How generated layer groups are finally named.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NamingStrategyKind {
    /// `<prefix>_<n>`
    Generic,
    /// `STRIPLINE_<n>` / `MICROSTRIP_<n>`
    Strip,
    /// Descriptive `STRIPLINE_<before>_<t>_<after>` names.
    #[default]
    StripWithThickness,
}

impl NamingStrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "GENERIC",
            Self::Strip => "STRIP",
            Self::StripWithThickness => "STRIP_WITH_THICKNESS",
        }
    }
}

impl From<String> for NamingStrategyKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "GENERIC" => Self::Generic,
            "STRIP" => Self::Strip,
            "STRIP_WITH_THICKNESS" => Self::StripWithThickness,
            other => {
                tracing::warn!(strategy = other, "unsupported layer group naming strategy, using GENERIC");
                Self::Generic
            }
        }
    }
}

impl From<NamingStrategyKind> for String {
    fn from(kind: NamingStrategyKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingStrategy {
    #[serde(default)]
    pub kind: NamingStrategyKind,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for NamingStrategy {
    fn default() -> Self {
        Self {
            kind: NamingStrategyKind::default(),
            prefix: default_prefix(),
        }
    }
}

/// Format rules for user-visible set and group names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRules {
    #[serde(default = "default_min_len")]
    pub min_len: usize,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            min_len: default_min_len(),
            max_len: default_max_len(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackupConfig {
    #[serde(default)]
    pub naming: NamingStrategy,
    /// Layer names treated as microstrip (surface) layers. Compared
    /// case-insensitively.
    #[serde(default = "default_microstrip_layer_names")]
    pub microstrip_layer_names: Vec<String>,
    #[serde(default = "default_golden_set_name")]
    pub golden_set_name: String,
    #[serde(default)]
    pub name_rules: NameRules,
}

fn default_prefix() -> String { "LG".into() }
fn default_min_len() -> usize { 2 }
fn default_max_len() -> usize { 48 }
fn default_golden_set_name() -> String { "Golden".into() }
fn default_microstrip_layer_names() -> Vec<String> {
    vec!["TOP".into(), "BOTTOM".into()]
}

impl Default for StackupConfig {
    fn default() -> Self {
        Self {
            naming: NamingStrategy::default(),
            microstrip_layer_names: default_microstrip_layer_names(),
            golden_set_name: default_golden_set_name(),
            name_rules: NameRules::default(),
        }
    }
}

impl StackupConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn is_microstrip_layer(&self, name: &str) -> bool {
        self.microstrip_layer_names
            .iter()
            .any(|m| m.eq_ignore_ascii_case(name))
    }
}
