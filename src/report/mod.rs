//! Run artifacts
//!
//! Writes the three JSON files downstream tooling consumes plus a run
//! summary. Every file is written whole, once per run.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, ReconcileResult};
use crate::migration::MigrationBatch;
use crate::reconcile::ReconciliationResult;
use crate::traits::{FileSystem, Output};
use crate::warnings::RunWarning;

pub const DELETED_FILE: &str = "drift-resources-deleted.json";
pub const DIFFERENCES_FILE: &str = "drift-resources-differences.json";
pub const MIGRATIONS_FILE: &str = "resources-to-import-location.json";
pub const SUMMARY_FILE: &str = "run-summary.json";

/// How the run summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Counts and warnings of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub changes_found: bool,
    pub deleted: usize,
    pub drifted: usize,
    pub drifted_attributes: usize,
    pub unmanaged: usize,
    pub unchanged: usize,
    pub importable: usize,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(result: &ReconciliationResult, batch: &MigrationBatch) -> Self {
        let warnings: Vec<&RunWarning> = result.warnings.iter().chain(&batch.warnings).collect();

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            changes_found: result.changes_found(),
            deleted: result.deleted.len(),
            drifted: result.drifted.len(),
            drifted_attributes: result.attribute_differences().len(),
            unmanaged: result.unmanaged.len(),
            unchanged: result.unchanged_count,
            importable: batch.len(),
            warnings: warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Paths of the files written by [`ArtifactWriter::write_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArtifacts {
    pub deleted: PathBuf,
    pub differences: PathBuf,
    pub migrations: PathBuf,
    pub summary: PathBuf,
}

pub struct ArtifactWriter<'a> {
    fs: &'a dyn FileSystem,
    output_dir: PathBuf,
}

impl<'a> ArtifactWriter<'a> {
    pub fn new(fs: &'a dyn FileSystem, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            output_dir: output_dir.into(),
        }
    }

    pub fn write_all(
        &self,
        result: &ReconciliationResult,
        batch: &MigrationBatch,
        summary: &RunSummary,
    ) -> ReconcileResult<RunArtifacts> {
        self.fs
            .create_dir_all(&self.output_dir)
            .map_err(|e| ReconcileError::OutputWrite {
                path: self.output_dir.display().to_string(),
                message: format!("{:#}", e),
            })?;

        let artifacts = RunArtifacts {
            deleted: self.write_json(DELETED_FILE, &result.deleted)?,
            differences: self.write_json(DIFFERENCES_FILE, &result.attribute_differences())?,
            migrations: self.write_json(MIGRATIONS_FILE, &batch.migrations)?,
            summary: self.write_json(SUMMARY_FILE, summary)?,
        };

        tracing::debug!(dir = %self.output_dir.display(), "Wrote run artifacts");
        Ok(artifacts)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> ReconcileResult<PathBuf> {
        let path = self.output_dir.join(name);
        let write_error = |message: String| ReconcileError::OutputWrite {
            path: path.display().to_string(),
            message,
        };

        let content = serde_json::to_string_pretty(value).map_err(|e| write_error(e.to_string()))?;
        self.fs
            .write(&path, &content)
            .map_err(|e| write_error(format!("{:#}", e)))?;

        Ok(path)
    }
}

/// Print the run summary in the requested format
pub fn render_summary(
    output: &dyn Output,
    summary: &RunSummary,
    output_dir: &Path,
    format: ReportFormat,
) -> Result<()> {
    match format {
        ReportFormat::Json => output.plain(&serde_json::to_string_pretty(summary)?),
        ReportFormat::Yaml => output.plain(&serde_yaml::to_string(summary)?),
        ReportFormat::Text => {
            output.section("Reconciliation Summary");
            output.key_value("Deleted", &summary.deleted.to_string());
            output.key_value(
                "Drifted",
                &format!(
                    "{} ({} attributes)",
                    summary.drifted, summary.drifted_attributes
                ),
            );
            output.key_value("Unmanaged", &summary.unmanaged.to_string());
            output.key_value("Importable", &summary.importable.to_string());
            output.key_value("Unchanged", &summary.unchanged.to_string());
            output.key_value_highlight("Output", &output_dir.display().to_string());

            if !summary.warnings.is_empty() {
                output.subsection(&format!("Warnings ({})", summary.warnings.len()));
                for warning in &summary.warnings {
                    output.warning(warning);
                }
            }

            output.blank();
            if summary.changes_found {
                output.warning("Changes found");
            } else {
                output.success("No changes found");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationDescriptor;
    use crate::reconcile::{AttributeDifference, DriftedResource};
    use crate::identity::CompositeKey;
    use crate::traits::{MockFileSystem, MockOutput, OutputMessage};

    fn sample() -> (ReconciliationResult, MigrationBatch) {
        let difference = AttributeDifference {
            recent_actor: None,
            recent_action_timestamp: None,
            attribute_name: "acl".to_string(),
            terraform_value: "private".to_string(),
            cloud_value: "public-read".to_string(),
            instance_id: "assets".to_string(),
            instance_region: "us-east-1".to_string(),
            state_file_name: "prod".to_string(),
            module_name: String::new(),
            resource_type: "aws_s3_bucket".to_string(),
            resource_name: "assets".to_string(),
        };
        let result = ReconciliationResult {
            drifted: vec![DriftedResource {
                key: CompositeKey::new("aws_s3_bucket", "assets"),
                differences: vec![difference],
            }],
            unchanged_count: 2,
            warnings: vec![RunWarning::NoDriftRule {
                resource_type: "aws_sns_topic".to_string(),
            }],
            ..Default::default()
        };

        let mut batch = MigrationBatch::default();
        let descriptor: MigrationDescriptor = serde_json::from_value(serde_json::json!({
            "TerraformConfigLocation": "aws_vpc.orphan_vpc",
            "RemoteCloudReference": "vpc-1"
        }))
        .unwrap();
        batch
            .migrations
            .insert(descriptor.config_location.clone(), descriptor);

        (result, batch)
    }

    #[test]
    fn test_summary_counts() {
        let (result, batch) = sample();
        let summary = RunSummary::new(&result, &batch);

        assert!(summary.changes_found);
        assert_eq!(summary.drifted, 1);
        assert_eq!(summary.drifted_attributes, 1);
        assert_eq!(summary.unmanaged, 0);
        assert_eq!(summary.unchanged, 2);
        assert_eq!(summary.importable, 1);
        assert_eq!(summary.warnings.len(), 1);
    }

    #[test]
    fn test_write_all_files() {
        let fs = MockFileSystem::new();
        let (result, batch) = sample();
        let summary = RunSummary::new(&result, &batch);

        let artifacts = ArtifactWriter::new(&fs, "/out")
            .write_all(&result, &batch, &summary)
            .unwrap();

        assert_eq!(artifacts.deleted, PathBuf::from("/out/drift-resources-deleted.json"));
        assert_eq!(
            fs.get_file_contents(&artifacts.deleted).unwrap().trim(),
            "[]"
        );

        let differences: serde_json::Value =
            serde_json::from_str(&fs.get_file_contents(&artifacts.differences).unwrap()).unwrap();
        assert_eq!(differences[0]["AttributeName"], "acl");
        assert_eq!(differences[0]["CloudValue"], "public-read");

        let migrations: serde_json::Value =
            serde_json::from_str(&fs.get_file_contents(&artifacts.migrations).unwrap()).unwrap();
        assert_eq!(
            migrations["aws_vpc.orphan_vpc"]["RemoteCloudReference"],
            "vpc-1"
        );

        let written: RunSummary =
            serde_json::from_str(&fs.get_file_contents(&artifacts.summary).unwrap()).unwrap();
        assert_eq!(written, summary);
    }

    #[test]
    fn test_render_text_summary() {
        let output = MockOutput::new();
        let (result, batch) = sample();
        let summary = RunSummary::new(&result, &batch);

        render_summary(&output, &summary, Path::new("/out"), ReportFormat::Text).unwrap();

        assert!(output.contains_message(&OutputMessage::KeyValue(
            "Drifted".to_string(),
            "1 (1 attributes)".to_string()
        )));
        assert!(output.contains_message(&OutputMessage::Warning("Changes found".to_string())));
        assert_eq!(output.get_warnings().len(), 2);
    }

    #[test]
    fn test_render_json_summary() {
        let output = MockOutput::new();
        let (result, batch) = sample();
        let summary = RunSummary::new(&result, &batch);

        render_summary(&output, &summary, Path::new("/out"), ReportFormat::Json).unwrap();

        let text = output.to_text();
        let parsed: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, summary);
    }
}
