//! Name format checks for user-editable set and group names.

use crate::config::NameRules;
use crate::error::LayerGroupError;

/// What kind of element a name belongs to (used in error messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    LayerGroupSet,
    LayerGroup,
}

impl NameKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::LayerGroupSet => "layer group set",
            Self::LayerGroup => "layer group",
        }
    }
}

/// Check every name against `rules`; the first violation is returned.
pub fn verify_naming<'a, I>(names: I, kind: NameKind, rules: &NameRules) -> Result<(), LayerGroupError>
where
    I: IntoIterator<Item = &'a str>,
{
    for name in names {
        if let Some(reason) = violation(name, rules) {
            return Err(LayerGroupError::InvalidName {
                kind: kind.label(),
                name: name.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

fn violation(name: &str, rules: &NameRules) -> Option<String> {
    let len = name.chars().count();
    if len < rules.min_len || len > rules.max_len {
        return Some(format!(
            "length must be between {} and {} characters (got {len})",
            rules.min_len, rules.max_len
        ));
    }
    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Some("must start with a letter or digit".into());
    }
    if let Some(bad) = name
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Some(format!("character '{bad}' is not allowed"));
    }
    None
}

/// Names that occur more than once, compared case-insensitively.
pub fn duplicate_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut dups: Vec<String> = Vec::new();
    for name in names {
        let key = name.to_lowercase();
        if !seen.insert(key.clone()) && !dups.iter().any(|d| d.to_lowercase() == key) {
            dups.push(name.to_string());
        }
    }
    dups
}
