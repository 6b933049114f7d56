use serde::{Deserialize, Serialize};

/// Cloud providers whose resources can be reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azurerm,
    Google,
}

impl Provider {
    /// Get the display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aws => "AWS",
            Provider::Azurerm => "Azure",
            Provider::Google => "Google Cloud",
        }
    }

    /// Get the Terraform provider name, which is also the resource type prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azurerm => "azurerm",
            Provider::Google => "google",
        }
    }

    /// Parse provider from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aws" => Some(Provider::Aws),
            "azure" | "azurerm" => Some(Provider::Azurerm),
            "gcp" | "google" | "google-beta" => Some(Provider::Google),
            _ => None,
        }
    }

    /// Get all supported providers
    pub fn all() -> Vec<Provider> {
        vec![Provider::Aws, Provider::Azurerm, Provider::Google]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extract the short provider name from a state file provider label
///
/// `provider["registry.terraform.io/hashicorp/aws"]` -> `aws`
pub fn provider_short_name(label: &str) -> String {
    if let Some(start) = label.rfind('/') {
        let name = &label[start + 1..];

        if let Some(end) = name.find(']') {
            return name[..end].trim_matches('"').to_string();
        }

        if let Some(end) = name.find('"') {
            return name[..end].to_string();
        }

        return name.trim_matches('"').to_string();
    }

    label.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_short_name() {
        assert_eq!(
            provider_short_name("provider[\"registry.terraform.io/hashicorp/aws\"]"),
            "aws"
        );
        assert_eq!(
            provider_short_name("module.net.provider[\"registry.terraform.io/hashicorp/google\"].west"),
            "google"
        );
        assert_eq!(provider_short_name("azurerm"), "azurerm");
    }

    #[test]
    fn test_provider_parse_aliases() {
        assert_eq!(Provider::parse("AWS"), Some(Provider::Aws));
        assert_eq!(Provider::parse("azure"), Some(Provider::Azurerm));
        assert_eq!(Provider::parse("gcp"), Some(Provider::Google));
        assert_eq!(Provider::parse("random"), None);
    }
}
