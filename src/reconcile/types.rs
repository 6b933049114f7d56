#[cfg(test)]
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::identity::CompositeKey;
use crate::state::ObservedResourceRecord;
use crate::warnings::RunWarning;

/// How the engine treats two records that produce the same composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the first record in load order and warn about the rest
    #[default]
    FirstSeen,
    /// Abort the run
    Reject,
}

/// A resource declared in desired state that the scan did not find
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeletedResource {
    #[serde(skip)]
    pub key: Option<CompositeKey>,
    pub resource_type: String,
    pub resource_name: String,
    pub module_name: String,
    pub state_file_name: String,
    #[serde(rename = "InstanceID")]
    pub instance_id: String,
}

/// One attribute whose desired and observed values differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDifference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_action_timestamp: Option<String>,
    pub attribute_name: String,
    pub terraform_value: String,
    pub cloud_value: String,
    #[serde(rename = "InstanceID")]
    pub instance_id: String,
    pub instance_region: String,
    pub state_file_name: String,
    pub module_name: String,
    pub resource_type: String,
    pub resource_name: String,
}

/// A resource present on both sides with at least one differing attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftedResource {
    pub key: CompositeKey,
    pub differences: Vec<AttributeDifference>,
}

/// Outcome of reconciling desired against observed state.
///
/// Every key of either input lands in exactly one of deleted, drifted,
/// unmanaged or unchanged. Unchanged resources are only counted. Each list is
/// sorted by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    pub deleted: Vec<DeletedResource>,
    pub drifted: Vec<DriftedResource>,
    pub unmanaged: Vec<ObservedResourceRecord>,
    pub unchanged_count: usize,
    pub warnings: Vec<RunWarning>,
}

impl ReconciliationResult {
    /// Whether anything needs attention downstream
    pub fn changes_found(&self) -> bool {
        !self.deleted.is_empty() || !self.drifted.is_empty() || !self.unmanaged.is_empty()
    }

    /// Every attribute difference, flattened across drifted resources
    pub fn attribute_differences(&self) -> Vec<&AttributeDifference> {
        self.drifted
            .iter()
            .flat_map(|d| d.differences.iter())
            .collect()
    }

    #[cfg(test)]
    pub fn deleted_keys(&self) -> BTreeSet<&CompositeKey> {
        self.deleted.iter().filter_map(|d| d.key.as_ref()).collect()
    }

    #[cfg(test)]
    pub fn drifted_keys(&self) -> BTreeSet<&CompositeKey> {
        self.drifted.iter().map(|d| &d.key).collect()
    }

    #[cfg(test)]
    pub fn unmanaged_keys(&self) -> BTreeSet<&CompositeKey> {
        self.unmanaged.iter().map(|u| &u.key).collect()
    }
}
