//! Desired state: resources Terraform already manages
//!
//! One snapshot per workspace, in the JSON layout `terraform state pull`
//! produces. Every (resource, instance) pair becomes one record.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::flatten::flatten_attributes;
use super::{MatchBy, WorkspaceSnapshot, index_key_string, instance_name};
use crate::error::{ReconcileError, ReconcileResult, SnapshotKind};
use crate::identity::{AttributeSet, CompositeKey, normalize, provider_short_name};
use crate::traits::FileSystem;

/// One resource instance declared in a workspace's state
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredResourceRecord {
    pub key: CompositeKey,
    /// Workspace (state file) the resource belongs to
    pub state_file: String,
    /// Module path, empty for the root module
    pub module: String,
    pub resource_type: String,
    /// Name as declared in configuration
    pub name: String,
    /// Normalized name half of the key
    pub local_name: String,
    /// `count` / `for_each` key, when the resource has one
    pub index_key: Option<String>,
    /// Raw provider label, e.g. `provider["registry.terraform.io/hashicorp/aws"]`
    pub provider_label: String,
    /// Short provider name parsed from the label
    pub provider: String,
    pub attributes: AttributeSet,
}

impl DesiredResourceRecord {
    /// Instance id as recorded in state, empty when absent
    pub fn instance_id(&self) -> &str {
        self.attributes.get("id").map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
struct StateFile {
    #[serde(default)]
    resources: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StateResource {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    module: Option<String>,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    instances: Vec<StateInstance>,
}

#[derive(Debug, Deserialize)]
struct StateInstance {
    #[serde(default)]
    index_key: Option<Value>,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
    #[serde(default)]
    attributes_flat: Option<Map<String, Value>>,
}

/// Parses workspace state snapshots into desired records
pub struct DesiredStateParser {
    match_by: MatchBy,
}

impl DesiredStateParser {
    pub fn new(match_by: MatchBy) -> Self {
        Self { match_by }
    }

    /// Load every workspace snapshot.
    ///
    /// Any unreadable or malformed file aborts the whole load: reconciling
    /// against partial desired state would report real resources as unmanaged.
    pub fn load_all(
        &self,
        fs: &dyn FileSystem,
        snapshots: &[WorkspaceSnapshot],
    ) -> ReconcileResult<Vec<DesiredResourceRecord>> {
        let mut records = Vec::new();

        for snapshot in snapshots {
            let content =
                fs.read_to_string(&snapshot.path)
                    .map_err(|e| ReconcileError::SnapshotRead {
                        kind: SnapshotKind::Desired,
                        path: snapshot.path.display().to_string(),
                        message: format!("{:#}", e),
                    })?;

            let parsed = self.parse(
                &snapshot.name,
                &snapshot.path.display().to_string(),
                &content,
            )?;
            tracing::debug!(
                workspace = %snapshot.name,
                records = parsed.len(),
                "Loaded desired state"
            );
            records.extend(parsed);
        }

        Ok(records)
    }

    /// Parse one workspace snapshot
    pub fn parse(
        &self,
        workspace: &str,
        path: &str,
        content: &str,
    ) -> ReconcileResult<Vec<DesiredResourceRecord>> {
        let state: StateFile =
            serde_json::from_str(content).map_err(|source| ReconcileError::SnapshotParse {
                kind: SnapshotKind::Desired,
                path: path.to_string(),
                source,
            })?;

        let mut records = Vec::new();

        for (index, raw) in state.resources.into_iter().enumerate() {
            let resource: StateResource =
                serde_json::from_value(raw).map_err(|source| ReconcileError::DesiredRecord {
                    path: path.to_string(),
                    index,
                    source,
                })?;

            if resource.mode.as_deref() == Some("data") {
                tracing::debug!(
                    "Skipping data source {}.{}",
                    resource.resource_type,
                    resource.name
                );
                continue;
            }

            let instance_count = resource.instances.len();
            for (position, instance) in resource.instances.iter().enumerate() {
                records.push(self.build_record(
                    workspace,
                    &resource,
                    instance,
                    position,
                    instance_count,
                ));
            }
        }

        Ok(records)
    }

    fn build_record(
        &self,
        workspace: &str,
        resource: &StateResource,
        instance: &StateInstance,
        position: usize,
        instance_count: usize,
    ) -> DesiredResourceRecord {
        let attributes = instance
            .attributes
            .as_ref()
            .or(instance.attributes_flat.as_ref())
            .map(flatten_attributes)
            .unwrap_or_default();

        let index_key = instance.index_key.as_ref().and_then(index_key_string);
        let instance_name = instance_name(
            &resource.name,
            index_key.as_deref(),
            position,
            instance_count,
        );

        let raw_identity = self.match_by.raw_identity(&instance_name, &attributes);
        let key = CompositeKey::new(&resource.resource_type, raw_identity);

        DesiredResourceRecord {
            key,
            state_file: workspace.to_string(),
            module: resource.module.clone().unwrap_or_default(),
            resource_type: resource.resource_type.clone(),
            name: resource.name.clone(),
            local_name: normalize(raw_identity),
            index_key,
            provider_label: resource.provider.clone(),
            provider: provider_short_name(&resource.provider),
            attributes,
        }
    }
}
