use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};

use crate::config::RunConfig;
use crate::context::Context;
use crate::identity::{AttributeSet, CompositeKey, Provider};

pub struct ResolveCommand;

impl ResolveCommand {
    /// Show every identity the pipeline derives for one resource
    pub fn execute(
        ctx: &Context,
        provider: &str,
        resource_type: &str,
        name: Option<&str>,
        attributes: &[String],
        config: Option<&Path>,
    ) -> Result<()> {
        let provider = Provider::parse(provider)
            .with_context(|| format!("Unknown provider '{}'", provider))?;
        let attributes = parse_attributes(attributes)?;
        let config = match config {
            Some(path) => RunConfig::load(&*ctx.fs, path)?,
            None => RunConfig::default(),
        };
        let formats = config.import_formats(&*ctx.fs)?;
        let strategies = config.strategies();

        ctx.output
            .section(&format!("{} ({})", resource_type, provider.display_name()));

        if let Some(name) = name {
            ctx.output
                .key_value("Composite key", CompositeKey::new(resource_type, name).as_str());
        }

        ctx.output.key_value(
            "Observed id",
            &strategies.observed_id(provider, resource_type, &attributes),
        );
        if let Some(region) = strategies.region(provider, &attributes) {
            ctx.output.key_value("Region", &region);
        }

        let reference = formats.canonical_reference(provider, resource_type, &attributes)?;
        ctx.output
            .key_value_highlight("Import reference", reference.as_str());

        Ok(())
    }
}

/// Parse repeated `key=value` arguments
fn parse_attributes(values: &[String]) -> Result<AttributeSet> {
    values
        .iter()
        .map(|value| {
            value
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("Expected key=value, got '{}'", value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFileSystem, MockOutput, OutputMessage};
    use std::sync::Arc;

    fn run(
        provider: &str,
        resource_type: &str,
        name: Option<&str>,
        attributes: &[&str],
    ) -> (Result<()>, Arc<MockOutput>) {
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(Arc::new(MockFileSystem::new()), output.clone());
        let attributes: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();

        let result =
            ResolveCommand::execute(&ctx, provider, resource_type, name, &attributes, None);
        (result, output)
    }

    #[test]
    fn test_resolve_google_bucket() {
        let (result, output) = run(
            "gcp",
            "google_storage_bucket",
            Some("tfer--logs-bucket"),
            &["project=p1", "name=logs-bucket", "id=logs-bucket", "location=EU"],
        );

        result.unwrap();
        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Composite key".to_string(),
            "google_storage_bucket.logs_bucket".to_string()
        )));
        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Observed id".to_string(),
            "projects/_/buckets/logs-bucket".to_string()
        )));
        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Region".to_string(),
            "EU".to_string()
        )));
        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Import reference".to_string(),
            "p1/logs-bucket".to_string()
        )));
    }

    #[test]
    fn test_resolve_missing_attribute_fails() {
        let (result, _output) = run("google", "google_storage_bucket", None, &["project=p1"]);

        let err = result.unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_resolve_unknown_type_fails() {
        let (result, _output) = run("aws", "aws_made_up", None, &["id=x"]);
        assert!(result.unwrap_err().to_string().contains("aws_made_up"));
    }

    #[test]
    fn test_parse_attributes() {
        let parsed = parse_attributes(&["a=1".to_string(), "b=x=y".to_string()]).unwrap();
        assert_eq!(parsed.get("b").map(String::as_str), Some("x=y"));
        assert!(parse_attributes(&["novalue".to_string()]).is_err());
    }
}
