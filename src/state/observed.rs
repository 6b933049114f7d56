//! Observed state: resources the scanner found in the cloud account

use serde_json::{Map, Value};

use super::flatten::flatten_attributes;
use super::{MatchBy, ObservedSnapshot, index_key_string, instance_name};
use crate::error::{ReconcileError, ReconcileResult, SnapshotKind};
use crate::identity::{AttributeSet, CompositeKey, Provider, normalize};
use crate::traits::FileSystem;
use crate::warnings::RunWarning;

/// One live resource instance reported by the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedResourceRecord {
    pub key: CompositeKey,
    pub resource_type: String,
    /// Raw name as emitted by the scanner (`tfer--...`)
    pub name: String,
    /// Normalized name half of the key
    pub local_name: String,
    pub provider: Provider,
    /// Label of the snapshot the record came from (`aws:prod`)
    pub snapshot: String,
    pub attributes: AttributeSet,
}

impl ObservedResourceRecord {
    /// Configuration address the resource would be imported to
    pub fn config_location(&self) -> String {
        format!("{}.{}", self.resource_type, self.local_name)
    }
}

/// Records parsed from observed snapshots plus the entries that were skipped
#[derive(Debug, Default)]
pub struct ObservedLoad {
    pub records: Vec<ObservedResourceRecord>,
    pub warnings: Vec<RunWarning>,
}

/// Parses scanner snapshots into observed records
pub struct ObservedStateParser {
    match_by: MatchBy,
}

impl ObservedStateParser {
    pub fn new(match_by: MatchBy) -> Self {
        Self { match_by }
    }

    /// Load every observed snapshot in order
    pub fn load_all(
        &self,
        fs: &dyn FileSystem,
        snapshots: &[ObservedSnapshot],
    ) -> ReconcileResult<ObservedLoad> {
        let mut load = ObservedLoad::default();

        for snapshot in snapshots {
            let path = snapshot.path.display().to_string();
            let content = fs
                .read_to_string(&snapshot.path)
                .map_err(|e| ReconcileError::SnapshotRead {
                    kind: SnapshotKind::Observed,
                    path: path.clone(),
                    message: format!("{:#}", e),
                })?;

            let parsed = self.parse(snapshot.provider, &snapshot.label(), &path, &content)?;
            tracing::debug!(
                snapshot = %snapshot.label(),
                records = parsed.records.len(),
                skipped = parsed.warnings.len(),
                "Loaded observed state"
            );
            load.records.extend(parsed.records);
            load.warnings.extend(parsed.warnings);
        }

        Ok(load)
    }

    /// Parse one scanner snapshot.
    ///
    /// Entries without a `name` or `type` are skipped with a warning; the
    /// scanner emits partial entries for resources it could not fully read.
    pub fn parse(
        &self,
        provider: Provider,
        label: &str,
        path: &str,
        content: &str,
    ) -> ReconcileResult<ObservedLoad> {
        let root: Value =
            serde_json::from_str(content).map_err(|source| ReconcileError::SnapshotParse {
                kind: SnapshotKind::Observed,
                path: path.to_string(),
                source,
            })?;

        let resources = match root.get("resources") {
            Some(Value::Array(resources)) => resources.as_slice(),
            Some(Value::Null) | None => &[],
            Some(_) => {
                return Err(ReconcileError::SnapshotParse {
                    kind: SnapshotKind::Observed,
                    path: path.to_string(),
                    source: serde::de::Error::custom("'resources' must be an array"),
                });
            }
        };

        let mut load = ObservedLoad::default();

        for (index, entry) in resources.iter().enumerate() {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                load.warnings.push(skipped(label, index, "name"));
                continue;
            };
            let Some(resource_type) = entry.get("type").and_then(Value::as_str) else {
                load.warnings.push(skipped(label, index, "type"));
                continue;
            };

            let instances = entry
                .get("instances")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            for (position, instance) in instances.iter().enumerate() {
                let attributes = instance_attributes(instance);
                let index_key = instance.get("index_key").and_then(index_key_string);
                let instance_name =
                    instance_name(name, index_key.as_deref(), position, instances.len());

                let raw_identity = self.match_by.raw_identity(&instance_name, &attributes);
                load.records.push(ObservedResourceRecord {
                    key: CompositeKey::new(resource_type, raw_identity),
                    resource_type: resource_type.to_string(),
                    name: instance_name.clone(),
                    local_name: normalize(raw_identity),
                    provider,
                    snapshot: label.to_string(),
                    attributes,
                });
            }
        }

        Ok(load)
    }
}

fn instance_attributes(instance: &Value) -> AttributeSet {
    let empty = Map::new();
    let attributes = instance
        .get("attributes_flat")
        .or_else(|| instance.get("attributes"))
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    flatten_attributes(attributes)
}

fn skipped(label: &str, index: usize, field: &'static str) -> RunWarning {
    tracing::warn!("Skipping resource #{} in {}: missing '{}'", index, label, field);
    RunWarning::ObservedMissingField {
        snapshot: label.to_string(),
        index,
        field,
    }
}
