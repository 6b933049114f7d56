//! Import-format table
//!
//! Maps a (provider, resource type) pair to the template that builds the
//! reference a provider expects in `terraform import`. The table is plain
//! data: the defaults ship as JSON files embedded at compile time and users
//! can layer their own files on top.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::error::ResolveError;
use super::provider::Provider;
use super::AttributeSet;
use crate::error::{ReconcileError, ReconcileResult};

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\$(\d+)").expect("Invalid placeholder regex");
}

const EMBEDDED_FORMATS: [(Provider, &str); 3] = [
    (Provider::Aws, include_str!("../../data/import_formats/aws.json")),
    (Provider::Azurerm, include_str!("../../data/import_formats/azurerm.json")),
    (Provider::Google, include_str!("../../data/import_formats/google.json")),
];

/// Positional template for one resource type's import reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportLocationFormat {
    /// Template with `$0`, `$1`, ... placeholders
    pub format: String,
    /// Attribute names substituted into the placeholders, in order
    pub attributes: Vec<String>,
}

impl ImportLocationFormat {
    pub fn new(format: impl Into<String>, attributes: &[&str]) -> Self {
        Self {
            format: format.into(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Check that placeholders are exactly `$0..$n-1` for `n` attributes
    pub fn validate(&self) -> Result<(), String> {
        let mut placeholders = BTreeSet::new();
        for caps in PLACEHOLDER.captures_iter(&self.format) {
            let index: usize = caps[1]
                .parse()
                .map_err(|_| format!("placeholder '{}' is out of range", &caps[0]))?;
            placeholders.insert(index);
        }

        let expected: BTreeSet<usize> = (0..self.attributes.len()).collect();
        if placeholders != expected {
            return Err(format!(
                "format '{}' has placeholders {:?} but {} attribute(s)",
                self.format,
                placeholders,
                self.attributes.len()
            ));
        }

        Ok(())
    }

    /// Substitute attribute values into the template
    pub fn apply(
        &self,
        resource_type: &str,
        attributes: &AttributeSet,
    ) -> Result<CanonicalReference, ResolveError> {
        let mut values = Vec::with_capacity(self.attributes.len());
        for name in &self.attributes {
            let value = attributes
                .get(name)
                .ok_or_else(|| ResolveError::MissingAttribute {
                    resource_type: resource_type.to_string(),
                    attribute: name.clone(),
                })?;
            values.push(value.as_str());
        }

        // Single pass, so `$1` never clobbers `$10` and substituted values are
        // never re-scanned for placeholders.
        let reference = PLACEHOLDER.replace_all(&self.format, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| values.get(i))
                .map(|v| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });

        Ok(CanonicalReference(reference.into_owned()))
    }
}

/// Fully substituted import reference for one resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalReference(String);

impl CanonicalReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Import-format rules keyed by provider and resource type
#[derive(Debug, Clone, Default)]
pub struct ImportFormatTable {
    formats: HashMap<Provider, HashMap<String, ImportLocationFormat>>,
}

impl ImportFormatTable {
    /// Create an empty table (useful for fixtures)
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the rules shipped with the binary
    pub fn embedded() -> ReconcileResult<Self> {
        let mut table = Self::new();
        for (provider, json) in EMBEDDED_FORMATS {
            table.load_provider_json(provider, &format!("embedded/{}", provider), json)?;
        }
        Ok(table)
    }

    /// Load `{resource_type: {format, attributes}}` rules for one provider.
    ///
    /// Later loads replace earlier rules for the same type. Returns the number
    /// of rules loaded.
    pub fn load_provider_json(
        &mut self,
        provider: Provider,
        name: &str,
        json: &str,
    ) -> ReconcileResult<usize> {
        let rules: BTreeMap<String, ImportLocationFormat> =
            serde_json::from_str(json).map_err(|e| ReconcileError::TableParse {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let count = rules.len();
        for (resource_type, format) in rules {
            self.insert(provider, &resource_type, format)?;
        }

        Ok(count)
    }

    /// Load `{provider: {resource_type: {format, attributes}}}` rules
    pub fn load_json(&mut self, name: &str, json: &str) -> ReconcileResult<usize> {
        let by_provider: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|e| ReconcileError::TableParse {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let mut count = 0;
        for (provider_name, rules) in by_provider {
            let provider =
                Provider::parse(&provider_name).ok_or_else(|| ReconcileError::TableParse {
                    name: name.to_string(),
                    message: format!("unknown provider '{}'", provider_name),
                })?;
            count += self.load_provider_json(provider, name, &rules.to_string())?;
        }

        Ok(count)
    }

    /// Add or replace a single rule after validating it
    pub fn insert(
        &mut self,
        provider: Provider,
        resource_type: &str,
        format: ImportLocationFormat,
    ) -> ReconcileResult<()> {
        format
            .validate()
            .map_err(|message| ReconcileError::InvalidFormat {
                provider: provider.to_string(),
                resource_type: resource_type.to_string(),
                message,
            })?;

        self.formats
            .entry(provider)
            .or_default()
            .insert(resource_type.to_string(), format);
        Ok(())
    }

    pub fn get(&self, provider: Provider, resource_type: &str) -> Option<&ImportLocationFormat> {
        self.formats.get(&provider)?.get(resource_type)
    }

    /// Resource types with a rule for the provider, sorted
    pub fn resource_types(&self, provider: Provider) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .formats
            .get(&provider)
            .map(|rules| rules.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default();
        types.sort_unstable();
        types
    }

    /// Total number of rules across providers
    pub fn len(&self) -> usize {
        self.formats.values().map(|rules| rules.len()).sum()
    }

    /// Build the import reference for a resource.
    ///
    /// An unknown pair is a [`ResolveError::NoFormatRule`]; the resource is left
    /// unresolved rather than guessed.
    pub fn canonical_reference(
        &self,
        provider: Provider,
        resource_type: &str,
        attributes: &AttributeSet,
    ) -> Result<CanonicalReference, ResolveError> {
        let format = self
            .get(provider, resource_type)
            .ok_or_else(|| ResolveError::NoFormatRule {
                provider: provider.to_string(),
                resource_type: resource_type.to_string(),
            })?;

        format.apply(resource_type, attributes)
    }
}
