use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use super::actions::ResourceActions;
use super::rules::{DriftRules, FieldChange};
use super::types::{
    AttributeDifference, DeletedResource, DriftedResource, DuplicatePolicy, ReconciliationResult,
};
use crate::error::{ReconcileError, ReconcileResult, SnapshotKind};
use crate::identity::{CompositeKey, ProviderStrategies};
use crate::state::{DesiredResourceRecord, ObservedResourceRecord};
use crate::warnings::RunWarning;

/// Resource types that may be reported as deleted.
///
/// A type the scanner was not asked to scan is missing from observed state
/// without having been deleted, so it must not be reported.
///
/// A non-empty whitelist restricts the candidates to the listed types and the
/// blacklist is applied on top of it, so a type on both lists is never
/// reported as deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedScope {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
}

impl DeletedScope {
    pub fn allows(&self, resource_type: &str) -> bool {
        let listed = |list: &[String]| list.iter().any(|t| t == resource_type);
        (self.whitelist.is_empty() || listed(&self.whitelist)) && !listed(&self.blacklist)
    }
}

/// Classifies every resource of a run as deleted, drifted, unmanaged or unchanged
pub struct Reconciler {
    rules: DriftRules,
    strategies: ProviderStrategies,
    duplicates: DuplicatePolicy,
    deleted_scope: DeletedScope,
    actions: ResourceActions,
}

impl Reconciler {
    pub fn new(rules: DriftRules, strategies: ProviderStrategies) -> Self {
        Self {
            rules,
            strategies,
            duplicates: DuplicatePolicy::default(),
            deleted_scope: DeletedScope::default(),
            actions: ResourceActions::new(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn with_deleted_scope(mut self, scope: DeletedScope) -> Self {
        self.deleted_scope = scope;
        self
    }

    pub fn with_actions(mut self, actions: ResourceActions) -> Self {
        self.actions = actions;
        self
    }

    /// Reconcile desired against observed records.
    ///
    /// Both inputs are indexed by composite key and the union of keys is
    /// walked once, in key order, so identical inputs always produce an
    /// identical result.
    pub fn reconcile(
        &self,
        desired: &[DesiredResourceRecord],
        observed: &[ObservedResourceRecord],
    ) -> ReconcileResult<ReconciliationResult> {
        let mut result = ReconciliationResult::default();

        let desired_by_key = self.index(
            desired,
            SnapshotKind::Desired,
            |r| &r.key,
            |r| format!("{}.{} in {}", r.resource_type, r.name, r.state_file),
            &mut result.warnings,
        )?;
        let observed_by_key = self.index(
            observed,
            SnapshotKind::Observed,
            |r| &r.key,
            |r| format!("{}.{} in {}", r.resource_type, r.name, r.snapshot),
            &mut result.warnings,
        )?;

        let keys: BTreeSet<&CompositeKey> = desired_by_key
            .keys()
            .chain(observed_by_key.keys())
            .copied()
            .collect();
        let mut types_without_rule = BTreeSet::new();

        for key in keys {
            match (desired_by_key.get(key), observed_by_key.get(key)) {
                (Some(d), None) => {
                    if self.deleted_scope.allows(&d.resource_type) {
                        result.deleted.push(deleted_resource(d));
                    } else {
                        result.unchanged_count += 1;
                    }
                }
                (None, Some(o)) => result.unmanaged.push((*o).clone()),
                (Some(d), Some(o)) => {
                    match self.rules.compare(&d.resource_type, &d.attributes, &o.attributes) {
                        None => {
                            types_without_rule.insert(d.resource_type.clone());
                            result.unchanged_count += 1;
                        }
                        Some(changes) if changes.is_empty() => result.unchanged_count += 1,
                        Some(changes) => result.drifted.push(DriftedResource {
                            key: key.clone(),
                            differences: self.differences(d, o, changes),
                        }),
                    }
                }
                (None, None) => {}
            }
        }

        for resource_type in types_without_rule {
            tracing::warn!(
                "No tracked attributes for '{}', drift not evaluated",
                resource_type
            );
            result
                .warnings
                .push(RunWarning::NoDriftRule { resource_type });
        }

        tracing::info!(
            deleted = result.deleted.len(),
            drifted = result.drifted.len(),
            unmanaged = result.unmanaged.len(),
            unchanged = result.unchanged_count,
            "Reconciliation complete"
        );

        Ok(result)
    }

    fn index<'r, T>(
        &self,
        records: &'r [T],
        side: SnapshotKind,
        key: impl Fn(&T) -> &CompositeKey,
        describe: impl Fn(&T) -> String,
        warnings: &mut Vec<RunWarning>,
    ) -> ReconcileResult<BTreeMap<&'r CompositeKey, &'r T>> {
        let mut index = BTreeMap::new();

        for record in records {
            match index.entry(key(record)) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
                Entry::Occupied(entry) => {
                    let first = describe(*entry.get());
                    let second = describe(record);

                    match self.duplicates {
                        DuplicatePolicy::Reject => {
                            return Err(ReconcileError::DuplicateIdentity {
                                key: key(record).clone(),
                                side,
                                first,
                                second,
                            });
                        }
                        DuplicatePolicy::FirstSeen => {
                            tracing::warn!(
                                "Duplicate {} identity '{}': keeping {}, ignoring {}",
                                side,
                                key(record),
                                first,
                                second
                            );
                            warnings.push(RunWarning::DuplicateIdentity {
                                key: key(record).clone(),
                                side,
                                kept: first,
                                dropped: second,
                            });
                        }
                    }
                }
            }
        }

        Ok(index)
    }

    fn differences(
        &self,
        desired: &DesiredResourceRecord,
        observed: &ObservedResourceRecord,
        changes: Vec<FieldChange>,
    ) -> Vec<AttributeDifference> {
        let instance_id = self.strategies.observed_id(
            observed.provider,
            &observed.resource_type,
            &observed.attributes,
        );
        let instance_region = self
            .strategies
            .region(observed.provider, &observed.attributes)
            .unwrap_or_default();

        let declared_address = format!("{}.{}", desired.resource_type, desired.name);
        let recent = self
            .actions
            .most_recent(&[desired.key.as_str(), &declared_address]);

        changes
            .into_iter()
            .map(|change| AttributeDifference {
                recent_actor: recent.map(|a| a.actor.clone()),
                recent_action_timestamp: recent.map(|a| a.timestamp.clone()),
                attribute_name: change.attribute,
                terraform_value: change.desired,
                cloud_value: change.observed,
                instance_id: instance_id.clone(),
                instance_region: instance_region.clone(),
                state_file_name: desired.state_file.clone(),
                module_name: desired.module.clone(),
                resource_type: desired.resource_type.clone(),
                resource_name: desired.name.clone(),
            })
            .collect()
    }
}

fn deleted_resource(record: &DesiredResourceRecord) -> DeletedResource {
    DeletedResource {
        key: Some(record.key.clone()),
        resource_type: record.resource_type.clone(),
        resource_name: record.name.clone(),
        module_name: record.module.clone(),
        state_file_name: record.state_file.clone(),
        instance_id: record.instance_id().to_string(),
    }
}
