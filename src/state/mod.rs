//! Snapshot loading
//!
//! Parses the two independent inputs of a run into normalized records:
//! desired state (one Terraform state file per workspace) and observed state
//! (one scanner snapshot per provider/division).

mod desired;
mod flatten;
mod observed;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{AttributeSet, Provider};
use crate::traits::FileSystem;

pub use desired::{DesiredResourceRecord, DesiredStateParser};
pub use flatten::{flatten_attributes, is_count_key};
pub use observed::{ObservedLoad, ObservedResourceRecord, ObservedStateParser};

/// Which raw value the local half of a composite key is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchBy {
    /// Resource name (plus instance key); the scanner names resources after them
    #[default]
    Name,
    /// Instance `id` attribute, falling back to the name when there is none
    Id,
}

impl MatchBy {
    /// Raw identity to normalize into the key for one instance
    pub fn raw_identity<'a>(&self, name: &'a str, attributes: &'a AttributeSet) -> &'a str {
        match self {
            MatchBy::Name => name,
            MatchBy::Id => attributes
                .get("id")
                .map(String::as_str)
                .filter(|id| !id.is_empty())
                .unwrap_or(name),
        }
    }
}

/// Name of one instance of a resource, before normalization.
///
/// `count`/`for_each` instances carry their index key; keyless instances of a
/// multi-instance resource fall back to their position. Both snapshots go
/// through this so the same instance gets the same key on either side.
pub fn instance_name(
    name: &str,
    index_key: Option<&str>,
    position: usize,
    instance_count: usize,
) -> String {
    match index_key {
        Some(key) => format!("{}-{}", name, key),
        None if instance_count > 1 => format!("{}-{}", name, position),
        None => name.to_string(),
    }
}

/// `index_key` as a string: strings verbatim, numbers in JSON form
pub fn index_key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Desired-state snapshot of one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSnapshot {
    pub name: String,
    pub path: PathBuf,
}

impl WorkspaceSnapshot {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Workspace named after the file stem (`states/prod.json` -> `prod`)
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, path)
    }
}

/// Scanner snapshot for one provider and optional division (account, project, subscription)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedSnapshot {
    pub provider: Provider,
    pub division: Option<String>,
    pub path: PathBuf,
}

impl ObservedSnapshot {
    pub fn new(provider: Provider, division: Option<&str>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            division: division.map(str::to_string),
            path: path.into(),
        }
    }

    /// `provider` or `provider:division`
    pub fn label(&self) -> String {
        match &self.division {
            Some(division) => format!("{}:{}", self.provider, division),
            None => self.provider.to_string(),
        }
    }
}

/// Find workspace snapshots (`*.json`) directly inside a directory, sorted by name
pub fn discover_workspaces(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<WorkspaceSnapshot>> {
    if !fs.is_dir(dir) {
        anyhow::bail!("State directory not found: {}", dir.display());
    }

    let entries = fs
        .walk_dir(dir, 1)
        .with_context(|| format!("Failed to list state directory: {}", dir.display()))?;

    let mut workspaces: Vec<WorkspaceSnapshot> = entries
        .iter()
        .filter(|path| fs.is_file(path))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .map(|path| WorkspaceSnapshot::from_path(path))
        .collect();

    workspaces.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(workspaces)
}
