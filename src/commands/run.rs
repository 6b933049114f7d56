use std::path::PathBuf;

use anyhow::{Context as AnyhowContext, Result};
use clap::Args;

use crate::config::{ObservedEntry, RunConfig, parse_workspace};
use crate::context::Context;
use crate::migration::MigrationGenerator;
use crate::reconcile::{DuplicatePolicy, Reconciler, ResourceActions};
use crate::report::{ArtifactWriter, ReportFormat, RunSummary, render_summary};
use crate::state::{
    DesiredStateParser, MatchBy, ObservedStateParser, WorkspaceSnapshot, discover_workspaces,
};

const DEFAULT_OUTPUT_DIR: &str = "tfreconcile-output";

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Run configuration file (YAML)
    #[arg(short, long, env = "TFRECONCILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory of workspace state snapshots (every *.json file is one workspace)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Workspace state snapshot as name=path (repeatable)
    #[arg(long = "state", value_name = "NAME=PATH")]
    pub states: Vec<String>,

    /// Scanner snapshot as provider[:division]=path (repeatable)
    #[arg(long = "observed", value_name = "PROVIDER[:DIVISION]=PATH")]
    pub observed: Vec<String>,

    /// Directory the run artifacts are written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Cloud actions file used to attribute drift to an actor
    #[arg(long)]
    pub actions: Option<PathBuf>,

    /// Build composite keys from resource names or instance ids
    #[arg(long, value_enum)]
    pub match_by: Option<MatchBy>,

    /// What to do when two resources share a composite key
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicatePolicy>,

    /// Summary format
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Exit with status 2 when changes are found
    #[arg(long)]
    pub detailed_exitcode: bool,
}

pub struct RunCommand;

impl RunCommand {
    /// Run the full pipeline; returns whether any change was found
    pub fn execute(ctx: &Context, args: &RunArgs) -> Result<bool> {
        let mut config = match &args.config {
            Some(path) => RunConfig::load(&*ctx.fs, path)?,
            None => RunConfig::default(),
        };
        Self::apply_overrides(&mut config, args)?;

        let text = args.format == ReportFormat::Text;
        let workspaces = Self::collect_workspaces(ctx, &config)?;
        let observed_snapshots = config.observed_snapshots();

        if observed_snapshots.is_empty() {
            anyhow::bail!(
                "No observed snapshot given. Use --observed provider[:division]=path or the 'observed' config key."
            );
        }

        if text {
            ctx.output.section("Loading Snapshots");
            ctx.output
                .key_value("Workspaces", &workspaces.len().to_string());
            ctx.output
                .key_value("Observed snapshots", &observed_snapshots.len().to_string());
            if workspaces.is_empty() {
                ctx.output
                    .info("No workspace snapshots: every observed resource is unmanaged");
            }
        }

        let desired = DesiredStateParser::new(config.match_by)
            .load_all(&*ctx.fs, &workspaces)
            .context("Failed to load desired state")?;
        let observed = ObservedStateParser::new(config.match_by)
            .load_all(&*ctx.fs, &observed_snapshots)
            .context("Failed to load observed state")?;

        if text {
            ctx.output
                .key_value("Desired resources", &desired.len().to_string());
            ctx.output
                .key_value("Observed resources", &observed.records.len().to_string());
        }

        let mut reconciler = Reconciler::new(config.drift_rules()?, config.strategies())
            .with_duplicate_policy(config.duplicates)
            .with_deleted_scope(config.deleted_scope());
        if let Some(path) = &config.actions {
            reconciler = reconciler.with_actions(ResourceActions::load(&*ctx.fs, path)?);
        }

        let mut result = reconciler.reconcile(&desired, &observed.records)?;
        let mut warnings = observed.warnings;
        warnings.append(&mut result.warnings);
        result.warnings = warnings;

        let formats = config.import_formats(&*ctx.fs)?;
        let batch = MigrationGenerator::new(&formats).generate(&result.unmanaged);

        let summary = RunSummary::new(&result, &batch);
        let output_dir = config
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        ArtifactWriter::new(&*ctx.fs, &output_dir).write_all(&result, &batch, &summary)?;

        render_summary(&*ctx.output, &summary, &output_dir, args.format)?;

        Ok(summary.changes_found)
    }

    fn apply_overrides(config: &mut RunConfig, args: &RunArgs) -> Result<()> {
        if let Some(dir) = &args.state_dir {
            config.state_dir = Some(dir.clone());
        }

        if !args.states.is_empty() {
            config.workspaces.clear();
            for value in &args.states {
                let workspace = parse_workspace(value)?;
                config.workspaces.insert(workspace.name, workspace.path);
            }
        }

        if !args.observed.is_empty() {
            config.observed = args
                .observed
                .iter()
                .map(|value| ObservedEntry::parse(value))
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(dir) = &args.output_dir {
            config.output_dir = Some(dir.clone());
        }
        if let Some(path) = &args.actions {
            config.actions = Some(path.clone());
        }
        if let Some(match_by) = args.match_by {
            config.match_by = match_by;
        }
        if let Some(duplicates) = args.duplicates {
            config.duplicates = duplicates;
        }

        Ok(())
    }

    /// Explicit workspaces plus every snapshot in the state directory, sorted by name
    fn collect_workspaces(ctx: &Context, config: &RunConfig) -> Result<Vec<WorkspaceSnapshot>> {
        let mut workspaces = config.explicit_workspaces();

        if let Some(dir) = &config.state_dir {
            for workspace in discover_workspaces(&*ctx.fs, dir)? {
                if workspaces.iter().any(|w| w.name == workspace.name) {
                    anyhow::bail!(
                        "Workspace '{}' is given explicitly and also found in {}",
                        workspace.name,
                        dir.display()
                    );
                }
                workspaces.push(workspace);
            }
        }

        workspaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workspaces)
    }
}
