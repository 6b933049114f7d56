//! Test helpers for building state snapshots and records
//!
//! Snapshot builders produce JSON in the same layout the real inputs use,
//! so parser tests and command tests can share fixtures.

#![cfg(test)]

use serde_json::{Map, Value, json};

use crate::identity::{AttributeSet, CompositeKey, Provider, normalize};
use crate::state::{DesiredResourceRecord, ObservedResourceRecord};

/// Build an attribute set from literal pairs
pub fn attrs(pairs: &[(&str, &str)]) -> AttributeSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn attribute_map(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

fn provider_label(resource_type: &str) -> String {
    let prefix = resource_type.split('_').next().unwrap_or(resource_type);
    format!("provider[\"registry.terraform.io/hashicorp/{}\"]", prefix)
}

/// Builder for a workspace state snapshot (`terraform state pull` layout)
#[derive(Default)]
pub struct DesiredStateBuilder {
    resources: Vec<Value>,
}

impl DesiredStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(self, resource: Value) -> Self {
        self.raw_resource(resource)
    }

    /// Add a resource entry exactly as given
    pub fn raw_resource(mut self, resource: Value) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn build(self) -> String {
        json!({
            "version": 4,
            "terraform_version": "1.5.7",
            "resources": self.resources,
        })
        .to_string()
    }
}

/// Managed resource with a single instance
pub fn desired_resource(resource_type: &str, name: &str, pairs: &[(&str, &str)]) -> Value {
    json!({
        "mode": "managed",
        "type": resource_type,
        "name": name,
        "provider": provider_label(resource_type),
        "instances": [
            {"schema_version": 0, "attributes": attribute_map(pairs)}
        ]
    })
}

/// Builder for a scanner snapshot
#[derive(Default)]
pub struct ObservedStateBuilder {
    resources: Vec<Value>,
}

impl ObservedStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(self, resource: Value) -> Self {
        self.raw_resource(resource)
    }

    pub fn raw_resource(mut self, resource: Value) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn build(self) -> String {
        json!({
            "version": 3,
            "resources": self.resources,
        })
        .to_string()
    }
}

/// Scanner entry with a single flattened instance
pub fn observed_resource(resource_type: &str, name: &str, pairs: &[(&str, &str)]) -> Value {
    json!({
        "mode": "managed",
        "type": resource_type,
        "name": name,
        "provider": provider_label(resource_type),
        "instances": [
            {"attributes_flat": attribute_map(pairs)}
        ]
    })
}

/// Desired record in workspace `main`, keyed by name
pub fn desired_record(
    resource_type: &str,
    name: &str,
    pairs: &[(&str, &str)],
) -> DesiredResourceRecord {
    let provider = resource_type
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string();

    DesiredResourceRecord {
        key: CompositeKey::new(resource_type, name),
        state_file: "main".to_string(),
        module: String::new(),
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        local_name: normalize(name),
        index_key: None,
        provider_label: provider_label(resource_type),
        provider,
        attributes: attrs(pairs),
    }
}

/// Observed record as the scanner for `provider` would report it
pub fn observed_record(
    provider: Provider,
    resource_type: &str,
    name: &str,
    pairs: &[(&str, &str)],
) -> ObservedResourceRecord {
    ObservedResourceRecord {
        key: CompositeKey::new(resource_type, name),
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        local_name: normalize(name),
        provider,
        snapshot: provider.to_string(),
        attributes: attrs(pairs),
    }
}
