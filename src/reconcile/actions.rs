//! Who last touched a resource outside Terraform
//!
//! An external collaborator queries cloud audit logs and writes
//! `{"type.name": {"creation": {actor, timestamp}, "modified": {...}}}`.
//! The engine uses it to fill the recent-change fields of drift records.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult, SnapshotKind};
use crate::traits::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudAction {
    pub actor: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceActionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<CloudAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<CloudAction>,
}

impl ResourceActionRecord {
    /// Latest known action: the last modification, else the creation
    pub fn most_recent(&self) -> Option<&CloudAction> {
        self.modified.as_ref().or(self.creation.as_ref())
    }
}

/// Cloud actions keyed by resource address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceActions {
    actions: BTreeMap<String, ResourceActionRecord>,
}

impl ResourceActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> ReconcileResult<Self> {
        let display = path.display().to_string();
        let content = fs
            .read_to_string(path)
            .map_err(|e| ReconcileError::SnapshotRead {
                kind: SnapshotKind::Actions,
                path: display.clone(),
                message: format!("{:#}", e),
            })?;

        Self::from_json(&display, &content)
    }

    pub fn from_json(path: &str, content: &str) -> ReconcileResult<Self> {
        let actions: BTreeMap<String, ResourceActionRecord> = serde_json::from_str(content)
            .map_err(|source| ReconcileError::SnapshotParse {
                kind: SnapshotKind::Actions,
                path: path.to_string(),
                source,
            })?;

        tracing::debug!(path, records = actions.len(), "Loaded cloud actions");
        Ok(Self { actions })
    }

    #[cfg(test)]
    pub fn insert(&mut self, address: impl Into<String>, record: ResourceActionRecord) {
        self.actions.insert(address.into(), record);
    }

    /// Most recent action for the first address that has a record
    pub fn most_recent(&self, addresses: &[&str]) -> Option<&CloudAction> {
        addresses
            .iter()
            .find_map(|address| self.actions.get(*address))
            .and_then(ResourceActionRecord::most_recent)
    }
}
