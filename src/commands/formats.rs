use std::path::Path;

use anyhow::{Context as AnyhowContext, Result};

use crate::config::RunConfig;
use crate::context::Context;
use crate::identity::{ImportFormatTable, Provider};

pub struct FormatsCommand;

impl FormatsCommand {
    /// List the resource types that have an import format, per provider
    pub fn list(ctx: &Context, provider: Option<&str>, config: Option<&Path>) -> Result<()> {
        let table = Self::load_table(ctx, config)?;
        let providers = match provider {
            Some(name) => vec![parse_provider(name)?],
            None => Provider::all(),
        };

        for provider in providers {
            let types = table.resource_types(provider);
            ctx.output.section(&format!(
                "{} ({} resource types)",
                provider.display_name(),
                types.len()
            ));

            if types.is_empty() {
                ctx.output.dimmed("No import formats");
                continue;
            }

            for resource_type in types {
                ctx.output.list_item(resource_type);
            }
        }

        Ok(())
    }

    /// Show the import format rule of one resource type
    pub fn show(
        ctx: &Context,
        provider: &str,
        resource_type: &str,
        config: Option<&Path>,
    ) -> Result<()> {
        let provider = parse_provider(provider)?;
        let table = Self::load_table(ctx, config)?;
        let format = table.get(provider, resource_type).with_context(|| {
            format!(
                "No import format for '{}' ({})",
                resource_type,
                provider.as_str()
            )
        })?;

        ctx.output.section(resource_type);
        ctx.output.key_value("Provider", provider.display_name());
        ctx.output.key_value_highlight("Format", &format.format);
        ctx.output.subsection("Attributes");
        for (position, attribute) in format.attributes.iter().enumerate() {
            ctx.output
                .list_item(&format!("${} = {}", position, attribute));
        }

        Ok(())
    }

    fn load_table(ctx: &Context, config: Option<&Path>) -> Result<ImportFormatTable> {
        let config = match config {
            Some(path) => RunConfig::load(&*ctx.fs, path)?,
            None => RunConfig::default(),
        };
        config.import_formats(&*ctx.fs)
    }
}

fn parse_provider(name: &str) -> Result<Provider> {
    Provider::parse(name).with_context(|| format!("Unknown provider '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{FileSystem, MockFileSystem, MockOutput, OutputMessage};
    use std::sync::Arc;

    fn context() -> (Context, Arc<MockFileSystem>, Arc<MockOutput>) {
        let fs = Arc::new(MockFileSystem::new());
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(fs.clone(), output.clone());
        (ctx, fs, output)
    }

    #[test]
    fn test_list_single_provider() {
        let (ctx, _fs, output) = context();

        FormatsCommand::list(&ctx, Some("aws"), None).unwrap();

        let items = output.get_list_items();
        assert!(items.contains(&"aws_s3_bucket".to_string()));
        assert!(!items.iter().any(|t| t.starts_with("google_")));
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(items, sorted);
    }

    #[test]
    fn test_list_all_providers() {
        let (ctx, _fs, output) = context();

        FormatsCommand::list(&ctx, None, None).unwrap();

        let items = output.get_list_items();
        assert!(items.iter().any(|t| t.starts_with("aws_")));
        assert!(items.iter().any(|t| t.starts_with("azurerm_")));
        assert!(items.iter().any(|t| t.starts_with("google_")));
    }

    #[test]
    fn test_show_format() {
        let (ctx, _fs, output) = context();

        FormatsCommand::show(&ctx, "google", "google_storage_bucket", None).unwrap();

        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Format".to_string(),
            "$0/$1".to_string()
        )));
        assert_eq!(
            output.get_list_items(),
            vec!["$0 = project".to_string(), "$1 = name".to_string()]
        );
    }

    #[test]
    fn test_show_uses_configured_formats() {
        let (ctx, fs, output) = context();
        fs.write(
            Path::new("/cfg/tfreconcile.yaml"),
            "import_formats: [custom.json]\n",
        )
        .unwrap();
        fs.write(
            Path::new("/cfg/custom.json"),
            r#"{"aws": {"aws_custom_thing": {"format": "thing/$0", "attributes": ["id"]}}}"#,
        )
        .unwrap();

        FormatsCommand::show(
            &ctx,
            "aws",
            "aws_custom_thing",
            Some(Path::new("/cfg/tfreconcile.yaml")),
        )
        .unwrap();

        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Format".to_string(),
            "thing/$0".to_string()
        )));
    }

    #[test]
    fn test_show_unknown_type() {
        let (ctx, _fs, _output) = context();

        let err = FormatsCommand::show(&ctx, "aws", "aws_nothing", None).unwrap_err();
        assert!(err.to_string().contains("aws_nothing"));
    }

    #[test]
    fn test_unknown_provider() {
        let (ctx, _fs, _output) = context();
        assert!(FormatsCommand::list(&ctx, Some("oracle"), None).is_err());
    }
}
