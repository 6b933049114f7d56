//! Tracked-attribute rules for drift detection
//!
//! Only attributes a rule tracks are compared. Generated values (timestamps,
//! computed ARNs, fingerprints) change on every read and would otherwise
//! show up as drift on every run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};
use crate::identity::AttributeSet;
use crate::state::is_count_key;

const EMBEDDED_RULES: &str = include_str!("../../data/tracked_attributes.json");

/// What to do with resource types that have no tracked-attribute rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UntrackedTypes {
    /// Never report drift for them
    #[default]
    Skip,
    /// Compare every attribute not on the ignore list
    CompareAll,
}

/// An attribute name, or `*` for every attribute.
///
/// A pattern covers the attribute itself and everything nested below it, so
/// `tags` covers `tags.Name` but not `tags_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePattern(String);

impl AttributePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn matches(&self, key: &str) -> bool {
        if self.0 == "*" || self.0 == key {
            return true;
        }

        key.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Rule file layout, shared by the embedded defaults and user config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftRuleTable {
    /// Attributes never compared, for any type
    #[serde(default)]
    pub ignored: Vec<String>,
    /// Tracked attributes per resource type
    #[serde(default)]
    pub types: BTreeMap<String, Vec<String>>,
}

/// One tracked attribute whose values differ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub attribute: String,
    pub desired: String,
    pub observed: String,
}

/// Tracked and ignored attributes for drift comparison
#[derive(Debug, Clone, Default)]
pub struct DriftRules {
    tracked: HashMap<String, Vec<AttributePattern>>,
    ignored: Vec<AttributePattern>,
    untracked_types: UntrackedTypes,
}

impl DriftRules {
    /// Rules with nothing tracked and nothing ignored
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules shipped with the binary
    pub fn embedded() -> ReconcileResult<Self> {
        let mut rules = Self::new();
        rules.load_json("embedded/tracked_attributes.json", EMBEDDED_RULES)?;
        Ok(rules)
    }

    /// Parse a rule file and merge it in; see [`DriftRules::merge`]
    pub fn load_json(&mut self, name: &str, json: &str) -> ReconcileResult<()> {
        let table: DriftRuleTable =
            serde_json::from_str(json).map_err(|e| ReconcileError::TableParse {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        self.merge(&table);
        Ok(())
    }

    /// Merge a rule table: its types replace existing rules, ignores are added
    pub fn merge(&mut self, table: &DriftRuleTable) {
        for (resource_type, patterns) in &table.types {
            self.track(resource_type, patterns);
        }
        for pattern in &table.ignored {
            self.ignore(pattern);
        }
    }

    /// Set the tracked attributes of a resource type
    pub fn track<S: AsRef<str>>(&mut self, resource_type: &str, patterns: &[S]) -> &mut Self {
        self.tracked.insert(
            resource_type.to_string(),
            patterns
                .iter()
                .map(|p| AttributePattern::new(p.as_ref()))
                .collect(),
        );
        self
    }

    pub fn ignore(&mut self, pattern: &str) -> &mut Self {
        let pattern = AttributePattern::new(pattern);
        if !self.ignored.contains(&pattern) {
            self.ignored.push(pattern);
        }
        self
    }

    pub fn set_untracked_types(&mut self, untracked_types: UntrackedTypes) -> &mut Self {
        self.untracked_types = untracked_types;
        self
    }

    pub fn has_rule(&self, resource_type: &str) -> bool {
        self.tracked.contains_key(resource_type)
    }

    /// Whether drift can be evaluated for a type at all
    pub fn evaluates(&self, resource_type: &str) -> bool {
        self.has_rule(resource_type) || self.untracked_types == UntrackedTypes::CompareAll
    }

    /// Whether one flattened attribute of a type takes part in comparison
    pub fn is_tracked(&self, resource_type: &str, key: &str) -> bool {
        if is_count_key(key) || self.ignored.iter().any(|p| p.matches(key)) {
            return false;
        }

        match self.tracked.get(resource_type) {
            Some(patterns) => patterns.iter().any(|p| p.matches(key)),
            None => self.untracked_types == UntrackedTypes::CompareAll,
        }
    }

    /// Compare two attribute sets of one type.
    ///
    /// Returns `None` when the type cannot be evaluated. An attribute missing
    /// on one side compares as the empty string. Changes come back sorted by
    /// attribute name.
    pub fn compare(
        &self,
        resource_type: &str,
        desired: &AttributeSet,
        observed: &AttributeSet,
    ) -> Option<Vec<FieldChange>> {
        if !self.evaluates(resource_type) {
            return None;
        }

        let keys: BTreeSet<&String> = desired.keys().chain(observed.keys()).collect();
        let changes = keys
            .into_iter()
            .filter(|key| self.is_tracked(resource_type, key))
            .filter_map(|key| {
                let desired_value = desired.get(key).map(String::as_str).unwrap_or("");
                let observed_value = observed.get(key).map(String::as_str).unwrap_or("");
                (desired_value != observed_value).then(|| FieldChange {
                    attribute: key.clone(),
                    desired: desired_value.to_string(),
                    observed: observed_value.to_string(),
                })
            })
            .collect();

        Some(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::attrs;

    #[test]
    fn test_pattern_matches_nested_keys_only() {
        let tags = AttributePattern::new("tags");

        assert!(tags.matches("tags"));
        assert!(tags.matches("tags.Name"));
        assert!(!tags.matches("tags_all"));
        assert!(!tags.matches("tags_all.Name"));
        assert!(AttributePattern::new("*").matches("anything.at.all"));
    }

    #[test]
    fn test_embedded_rules_load() {
        let rules = DriftRules::embedded().unwrap();

        assert!(rules.has_rule("aws_s3_bucket"));
        assert!(rules.has_rule("google_storage_bucket"));
        assert!(rules.has_rule("azurerm_resource_group"));
        assert!(rules.is_tracked("aws_vpc", "cidr_block"));
        assert!(!rules.is_tracked("aws_vpc", "arn"));
        assert!(!rules.is_tracked("aws_vpc", "tags.%"));
    }

    #[test]
    fn test_untracked_attribute_differences_ignored() {
        let mut rules = DriftRules::new();
        rules.track("aws_s3_bucket", &["bucket", "tags"]);
        rules.ignore("last_modified");

        let desired = attrs(&[
            ("bucket", "assets"),
            ("tags.Team", "web"),
            ("last_modified", "2024-01-01T00:00:00Z"),
        ]);
        let observed = attrs(&[
            ("bucket", "assets"),
            ("tags.Team", "web"),
            ("last_modified", "2024-06-01T12:00:00Z"),
            ("hosted_zone_id", "Z3AQBSTGFYJSTF"),
        ]);

        let changes = rules.compare("aws_s3_bucket", &desired, &observed).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_compare_reports_tracked_changes() {
        let mut rules = DriftRules::new();
        rules.track("aws_s3_bucket", &["bucket", "tags"]);

        let desired = attrs(&[("bucket", "assets"), ("tags.Team", "web")]);
        let observed = attrs(&[
            ("bucket", "assets"),
            ("tags.Team", "data"),
            ("tags.Owner", "alice"),
        ]);

        let changes = rules.compare("aws_s3_bucket", &desired, &observed).unwrap();
        assert_eq!(
            changes,
            vec![
                FieldChange {
                    attribute: "tags.Owner".to_string(),
                    desired: String::new(),
                    observed: "alice".to_string(),
                },
                FieldChange {
                    attribute: "tags.Team".to_string(),
                    desired: "web".to_string(),
                    observed: "data".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_absent_equals_empty() {
        let mut rules = DriftRules::new();
        rules.track("aws_iam_role", &["description"]);

        let changes = rules
            .compare(
                "aws_iam_role",
                &attrs(&[("description", "")]),
                &attrs(&[]),
            )
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_types_without_rule() {
        let mut rules = DriftRules::new();
        rules.ignore("arn");
        let desired = attrs(&[("name", "a"), ("arn", "x")]);
        let observed = attrs(&[("name", "b"), ("arn", "y")]);

        assert_eq!(rules.compare("aws_sns_topic", &desired, &observed), None);

        rules.set_untracked_types(UntrackedTypes::CompareAll);
        let changes = rules.compare("aws_sns_topic", &desired, &observed).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, "name");
    }

    #[test]
    fn test_merge_replaces_type_rules() {
        let mut rules = DriftRules::new();
        rules.track("aws_vpc", &["cidr_block"]);

        rules
            .load_json("custom.json", r#"{"types": {"aws_vpc": ["tags"]}, "ignored": ["tags.CreatedBy"]}"#)
            .unwrap();

        assert!(!rules.is_tracked("aws_vpc", "cidr_block"));
        assert!(rules.is_tracked("aws_vpc", "tags.Name"));
        assert!(!rules.is_tracked("aws_vpc", "tags.CreatedBy"));
    }

    #[test]
    fn test_load_json_invalid() {
        let err = DriftRules::new().load_json("bad.json", "[1, 2]").unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
