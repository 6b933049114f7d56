use thiserror::Error;

/// Per-resource resolution failures. Callers treat these as recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No import-format rule exists for the (provider, resource type) pair
    #[error("No import format rule for '{resource_type}' ({provider})")]
    NoFormatRule {
        provider: String,
        resource_type: String,
    },

    /// The format names an attribute the resource does not have
    #[error("Resource '{resource_type}' is missing attribute '{attribute}' required by its import format")]
    MissingAttribute {
        resource_type: String,
        attribute: String,
    },
}
