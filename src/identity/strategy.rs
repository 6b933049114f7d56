//! Provider-specific identity rules
//!
//! Each provider has its own notion of which attribute identifies a live
//! resource and where its region lives. Those rules sit behind
//! [`ProviderStrategy`]; [`ProviderStrategies`] picks the implementation for a
//! provider so the resolver itself never branches on provider names.
//!
//! The observed id is not the import reference. It is the value downstream
//! consumers (log-query filters, reports) can use to find the resource, and
//! the fallback chain in [`GoogleStrategy`] prefers a queryable path over the
//! raw `id` whenever one is available.

use std::collections::HashMap;

use super::AttributeSet;
use super::provider::Provider;

/// Region reported when an AWS resource carries no region information
pub const AWS_DEFAULT_REGION: &str = "us-east-1";

/// Path segments that start a Google resource path
const GOOGLE_PATH_ROOTS: [&str; 2] = ["projects", "namespaces"];

/// Identity rules for one provider
pub trait ProviderStrategy: Send + Sync {
    /// Provider this strategy handles
    fn provider(&self) -> Provider;

    /// Identifier of a live resource, as used by downstream consumers
    fn observed_id(&self, resource_type: &str, attributes: &AttributeSet) -> String {
        let _ = resource_type;
        raw_id(attributes)
    }

    /// Region (or location) of a resource, when the provider has one
    fn region(&self, attributes: &AttributeSet) -> Option<String>;
}

fn raw_id(attributes: &AttributeSet) -> String {
    attributes.get("id").cloned().unwrap_or_default()
}

/// AWS: the raw id identifies the resource; region comes from `region` or the ARN
pub struct AwsStrategy;

impl ProviderStrategy for AwsStrategy {
    fn provider(&self) -> Provider {
        Provider::Aws
    }

    fn region(&self, attributes: &AttributeSet) -> Option<String> {
        if let Some(region) = attributes.get("region") {
            return Some(region.clone());
        }

        // arn:partition:service:region:account:resource
        if let Some(arn) = attributes.get("arn")
            && let Some(region) = arn.split(':').nth(3)
            && !region.is_empty()
        {
            return Some(region.to_string());
        }

        Some(AWS_DEFAULT_REGION.to_string())
    }
}

/// Azure: ids are already full resource paths; no region is reported
pub struct AzureStrategy;

impl ProviderStrategy for AzureStrategy {
    fn provider(&self) -> Provider {
        Provider::Azurerm
    }

    fn region(&self, _attributes: &AttributeSet) -> Option<String> {
        None
    }
}

/// Google: prefer the `projects/...` path embedded in `self_link` or `id`
pub struct GoogleStrategy {
    /// Templates (`$0` = raw id) for types whose raw id is not queryable
    overrides: HashMap<String, String>,
}

impl GoogleStrategy {
    pub fn new() -> Self {
        let mut overrides = HashMap::new();
        overrides.insert(
            "google_storage_bucket".to_string(),
            "projects/_/buckets/$0".to_string(),
        );
        Self { overrides }
    }

    /// Add or replace an override template for a resource type
    pub fn with_override(mut self, resource_type: &str, template: &str) -> Self {
        self.overrides
            .insert(resource_type.to_string(), template.to_string());
        self
    }
}

impl Default for GoogleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderStrategy for GoogleStrategy {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn observed_id(&self, resource_type: &str, attributes: &AttributeSet) -> String {
        if let Some(path) = attributes
            .get("self_link")
            .and_then(|link| extract_resource_path(link))
        {
            return path.to_string();
        }

        let id = raw_id(attributes);
        if let Some(path) = extract_resource_path(&id) {
            return path.to_string();
        }

        if let Some(template) = self.overrides.get(resource_type) {
            return template.replace("$0", &id);
        }

        id
    }

    fn region(&self, attributes: &AttributeSet) -> Option<String> {
        attributes.get("location").cloned()
    }
}

/// Cut a hierarchical resource path out of a field.
///
/// The path starts at the first known root token that is followed by a `/`;
/// roots are tried in order, so `projects/` wins over `namespaces/`.
fn extract_resource_path(field: &str) -> Option<&str> {
    GOOGLE_PATH_ROOTS.iter().find_map(|root| {
        let needle = format!("{}/", root);
        field.find(&needle).map(|start| &field[start..])
    })
}

/// Fallback for providers without a dedicated strategy
struct GenericStrategy;

impl GenericStrategy {
    fn observed_id(&self, attributes: &AttributeSet) -> String {
        raw_id(attributes)
    }
}

/// Registry selecting the identity strategy for a provider
pub struct ProviderStrategies {
    strategies: HashMap<Provider, Box<dyn ProviderStrategy>>,
}

impl ProviderStrategies {
    /// Create an empty registry; every provider falls back to the raw id
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with the built-in strategy for every supported provider
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(AwsStrategy));
        registry.register(Box::new(AzureStrategy));
        registry.register(Box::new(GoogleStrategy::new()));
        registry
    }

    /// Register a strategy, replacing any existing one for its provider
    pub fn register(&mut self, strategy: Box<dyn ProviderStrategy>) -> &mut Self {
        self.strategies.insert(strategy.provider(), strategy);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&dyn ProviderStrategy> {
        self.strategies.get(&provider).map(|s| s.as_ref())
    }

    /// Identifier of a live resource; see [`ProviderStrategy::observed_id`]
    pub fn observed_id(
        &self,
        provider: Provider,
        resource_type: &str,
        attributes: &AttributeSet,
    ) -> String {
        match self.get(provider) {
            Some(strategy) => strategy.observed_id(resource_type, attributes),
            None => GenericStrategy.observed_id(attributes),
        }
    }

    pub fn region(&self, provider: Provider, attributes: &AttributeSet) -> Option<String> {
        self.get(provider)?.region(attributes)
    }
}

impl Default for ProviderStrategies {
    fn default() -> Self {
        Self::with_defaults()
    }
}
