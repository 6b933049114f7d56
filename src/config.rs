//! Run configuration
//!
//! Everything a run needs can be given on the command line; a YAML file
//! holds the settings that rarely change between runs (rule overrides,
//! deleted-resource scope, extra import formats). Command-line values win.
//!
//! ```yaml
//! state_dir: states
//! observed:
//!   - provider: aws
//!     division: prod-account
//!     path: scans/aws-prod.json
//! output_dir: out
//! match_by: name
//! duplicates: first-seen
//! resources_blacklist: [aws_iam_policy_attachment]
//! drift:
//!   untracked_types: skip
//!   ignored: [tags.LastScanned]
//!   types:
//!     aws_s3_bucket: [bucket, acl, tags, versioning]
//! import_formats: [formats/custom.json]
//! google_observed_ids:
//!   google_pubsub_topic: projects/my-project/topics/$0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::identity::{GoogleStrategy, ImportFormatTable, Provider, ProviderStrategies};
use crate::reconcile::{DeletedScope, DriftRuleTable, DriftRules, DuplicatePolicy, UntrackedTypes};
use crate::state::{MatchBy, ObservedSnapshot, WorkspaceSnapshot};
use crate::traits::FileSystem;

/// Drift comparison settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Start from an empty rule set instead of the built-in one
    pub replace_defaults: bool,
    pub untracked_types: UntrackedTypes,
    #[serde(flatten)]
    pub rules: DriftRuleTable,
}

/// One observed snapshot entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedEntry {
    pub provider: Provider,
    #[serde(default)]
    pub division: Option<String>,
    pub path: PathBuf,
}

impl ObservedEntry {
    /// Parse `provider[:division]=path`
    pub fn parse(value: &str) -> Result<Self> {
        let (target, path) = value
            .split_once('=')
            .with_context(|| format!("Expected provider[:division]=path, got '{}'", value))?;

        let (provider_name, division) = match target.split_once(':') {
            Some((provider, division)) => (provider, Some(division.to_string())),
            None => (target, None),
        };

        let provider = Provider::parse(provider_name)
            .with_context(|| format!("Unknown provider '{}'", provider_name))?;

        if path.trim().is_empty() {
            anyhow::bail!("Missing snapshot path in '{}'", value);
        }

        Ok(Self {
            provider,
            division: division.filter(|d| !d.is_empty()),
            path: PathBuf::from(path),
        })
    }

    pub fn to_snapshot(&self) -> ObservedSnapshot {
        ObservedSnapshot::new(self.provider, self.division.as_deref(), self.path.clone())
    }
}

/// Parse `name=path` into a workspace snapshot
pub fn parse_workspace(value: &str) -> Result<WorkspaceSnapshot> {
    let (name, path) = value
        .split_once('=')
        .with_context(|| format!("Expected name=path, got '{}'", value))?;

    if name.trim().is_empty() || path.trim().is_empty() {
        anyhow::bail!("Expected name=path, got '{}'", value);
    }

    Ok(WorkspaceSnapshot::new(name.trim(), path.trim()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory whose `*.json` files are workspace snapshots
    pub state_dir: Option<PathBuf>,
    /// Explicit workspace snapshots, by workspace name
    pub workspaces: BTreeMap<String, PathBuf>,
    pub observed: Vec<ObservedEntry>,
    pub output_dir: Option<PathBuf>,
    /// Cloud actions file used to fill recent-change fields
    pub actions: Option<PathBuf>,
    pub match_by: MatchBy,
    pub duplicates: DuplicatePolicy,
    pub resources_whitelist: Vec<String>,
    pub resources_blacklist: Vec<String>,
    pub drift: DriftConfig,
    /// Extra `{provider: {type: {format, attributes}}}` files layered on the built-in table
    pub import_formats: Vec<PathBuf>,
    /// Observed-id templates (`$0` = raw id) for Google types whose id is not a path
    pub google_observed_ids: BTreeMap<String, String>,
}

impl RunConfig {
    /// Load a config file; relative paths inside it resolve against its directory
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: RunConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }

        tracing::debug!(config = %path.display(), "Loaded run configuration");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(dir) = self.state_dir.as_mut() {
            resolve(dir);
        }
        if let Some(dir) = self.output_dir.as_mut() {
            resolve(dir);
        }
        if let Some(file) = self.actions.as_mut() {
            resolve(file);
        }
        self.workspaces.values_mut().for_each(resolve);
        self.observed.iter_mut().for_each(|o| resolve(&mut o.path));
        self.import_formats.iter_mut().for_each(resolve);
    }

    /// Workspace snapshots named explicitly, sorted by workspace name
    pub fn explicit_workspaces(&self) -> Vec<WorkspaceSnapshot> {
        self.workspaces
            .iter()
            .map(|(name, path)| WorkspaceSnapshot::new(name.clone(), path.clone()))
            .collect()
    }

    pub fn observed_snapshots(&self) -> Vec<ObservedSnapshot> {
        self.observed.iter().map(ObservedEntry::to_snapshot).collect()
    }

    pub fn deleted_scope(&self) -> DeletedScope {
        DeletedScope {
            whitelist: self.resources_whitelist.clone(),
            blacklist: self.resources_blacklist.clone(),
        }
    }

    /// Built-in drift rules with the configured overrides applied
    pub fn drift_rules(&self) -> Result<DriftRules> {
        let mut rules = if self.drift.replace_defaults {
            DriftRules::new()
        } else {
            DriftRules::embedded()?
        };
        rules.merge(&self.drift.rules);
        rules.set_untracked_types(self.drift.untracked_types);
        Ok(rules)
    }

    /// Identity strategies with the configured Google templates applied
    pub fn strategies(&self) -> ProviderStrategies {
        let mut strategies = ProviderStrategies::with_defaults();

        if !self.google_observed_ids.is_empty() {
            let google = self
                .google_observed_ids
                .iter()
                .fold(GoogleStrategy::new(), |strategy, (resource_type, template)| {
                    strategy.with_override(resource_type, template)
                });
            strategies.register(Box::new(google));
        }

        strategies
    }

    /// Built-in import formats with every configured file layered on top
    pub fn import_formats(&self, fs: &dyn FileSystem) -> Result<ImportFormatTable> {
        let mut table = ImportFormatTable::embedded()?;

        for path in &self.import_formats {
            let content = fs
                .read_to_string(path)
                .with_context(|| format!("Failed to read import formats: {:?}", path))?;
            let count = table.load_json(&path.display().to_string(), &content)?;
            tracing::debug!(file = %path.display(), rules = count, "Loaded import formats");
        }

        tracing::debug!(rules = table.len(), "Import format table ready");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    #[test]
    fn test_parse_observed_entry() {
        let entry = ObservedEntry::parse("google:my-project=scans/g.json").unwrap();
        assert_eq!(entry.provider, Provider::Google);
        assert_eq!(entry.division.as_deref(), Some("my-project"));
        assert_eq!(entry.path, PathBuf::from("scans/g.json"));

        let entry = ObservedEntry::parse("aws=a.json").unwrap();
        assert_eq!(entry.provider, Provider::Aws);
        assert_eq!(entry.division, None);
        assert_eq!(entry.to_snapshot().label(), "aws");
    }

    #[test]
    fn test_parse_observed_entry_errors() {
        assert!(ObservedEntry::parse("aws").is_err());
        assert!(ObservedEntry::parse("oracle=o.json").is_err());
        assert!(ObservedEntry::parse("aws=").is_err());
    }

    #[test]
    fn test_parse_workspace() {
        let workspace = parse_workspace("prod=states/prod.json").unwrap();
        assert_eq!(workspace.name, "prod");
        assert_eq!(workspace.path, PathBuf::from("states/prod.json"));

        assert!(parse_workspace("prod").is_err());
        assert!(parse_workspace("=x.json").is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let fs = MockFileSystem::new();
        fs.write(
            Path::new("/project/tfreconcile.yaml"),
            r#"
state_dir: states
workspaces:
  shared: /abs/shared.json
observed:
  - provider: aws
    division: prod
    path: scans/aws.json
output_dir: out
duplicates: reject
match_by: id
resources_blacklist: [aws_iam_role]
drift:
  untracked_types: compare-all
  ignored: [tags.LastScanned]
  types:
    aws_vpc: [cidr_block]
"#,
        )
        .unwrap();

        let config = RunConfig::load(&fs, Path::new("/project/tfreconcile.yaml")).unwrap();

        assert_eq!(config.state_dir, Some(PathBuf::from("/project/states")));
        assert_eq!(config.output_dir, Some(PathBuf::from("/project/out")));
        assert_eq!(config.workspaces["shared"], PathBuf::from("/abs/shared.json"));
        assert_eq!(
            config.observed_snapshots(),
            vec![ObservedSnapshot::new(
                Provider::Aws,
                Some("prod"),
                "/project/scans/aws.json"
            )]
        );
        assert_eq!(config.duplicates, DuplicatePolicy::Reject);
        assert_eq!(config.match_by, MatchBy::Id);
        assert!(!config.deleted_scope().allows("aws_iam_role"));

        let rules = config.drift_rules().unwrap();
        assert!(rules.is_tracked("aws_vpc", "cidr_block"));
        assert!(!rules.is_tracked("aws_vpc", "tags.Name"));
        assert!(rules.is_tracked("aws_glue_job", "command.name"));
        assert!(!rules.is_tracked("aws_glue_job", "tags.LastScanned"));
    }

    #[test]
    fn test_defaults() {
        let config: RunConfig = serde_yaml::from_str("{}").unwrap();

        assert_eq!(config.match_by, MatchBy::Name);
        assert_eq!(config.duplicates, DuplicatePolicy::FirstSeen);
        assert!(config.drift_rules().unwrap().has_rule("aws_s3_bucket"));
    }

    #[test]
    fn test_import_formats_layer_on_builtin() {
        let fs = MockFileSystem::new();
        fs.write(
            Path::new("/formats.json"),
            r#"{"aws": {"aws_vpc": {"format": "vpc/$0", "attributes": ["id"]}}}"#,
        )
        .unwrap();

        let config = RunConfig {
            import_formats: vec![PathBuf::from("/formats.json")],
            ..Default::default()
        };
        let table = config.import_formats(&fs).unwrap();

        assert_eq!(table.get(Provider::Aws, "aws_vpc").unwrap().format, "vpc/$0");
        assert!(table.get(Provider::Aws, "aws_s3_bucket").is_some());
    }

    #[test]
    fn test_google_observed_id_templates() {
        let config: RunConfig = serde_yaml::from_str(
            "google_observed_ids:\n  google_pubsub_topic: projects/p/topics/$0\n",
        )
        .unwrap();
        let strategies = config.strategies();

        let topic = crate::test_helpers::attrs(&[("id", "t1")]);
        assert_eq!(
            strategies.observed_id(Provider::Google, "google_pubsub_topic", &topic),
            "projects/p/topics/t1"
        );

        let bucket = crate::test_helpers::attrs(&[("id", "b1")]);
        assert_eq!(
            strategies.observed_id(Provider::Google, "google_storage_bucket", &bucket),
            "projects/_/buckets/b1"
        );
    }

    #[test]
    fn test_load_invalid_yaml() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/bad.yaml"), "match_by: [").unwrap();

        assert!(RunConfig::load(&fs, Path::new("/bad.yaml")).is_err());
    }
}
