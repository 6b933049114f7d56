//! Import descriptors for unmanaged resources
//!
//! Each unmanaged resource that can be addressed gets a descriptor pairing
//! the configuration address it should live at with the reference the
//! provider accepts in `terraform import`. Resources that cannot be
//! addressed are reported and left out; one unsupported type never blocks
//! importing the rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::identity::{CanonicalReference, ImportFormatTable, ResolveError};
use crate::state::ObservedResourceRecord;
use crate::warnings::RunWarning;

/// One resource to import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    #[serde(rename = "TerraformConfigLocation")]
    pub config_location: String,
    #[serde(rename = "RemoteCloudReference")]
    pub remote_reference: CanonicalReference,
}

/// Descriptors keyed by configuration address, plus the resources left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationBatch {
    pub migrations: BTreeMap<String, MigrationDescriptor>,
    pub warnings: Vec<RunWarning>,
}

impl MigrationBatch {
    pub fn len(&self) -> usize {
        self.migrations.len()
    }
}

pub struct MigrationGenerator<'a> {
    formats: &'a ImportFormatTable,
}

impl<'a> MigrationGenerator<'a> {
    pub fn new(formats: &'a ImportFormatTable) -> Self {
        Self { formats }
    }

    pub fn generate(&self, unmanaged: &[ObservedResourceRecord]) -> MigrationBatch {
        let mut batch = MigrationBatch::default();

        for record in unmanaged {
            let config_location = record.config_location();

            match self.formats.canonical_reference(
                record.provider,
                &record.resource_type,
                &record.attributes,
            ) {
                Ok(remote_reference) => {
                    tracing::debug!("{} -> {}", config_location, remote_reference);
                    batch.migrations.insert(
                        config_location.clone(),
                        MigrationDescriptor {
                            config_location,
                            remote_reference,
                        },
                    );
                }
                Err(ResolveError::NoFormatRule {
                    provider,
                    resource_type,
                }) => {
                    tracing::warn!(
                        "No import format for '{}' ({}), skipping {}",
                        resource_type,
                        provider,
                        config_location
                    );
                    batch.warnings.push(RunWarning::NoFormatRule {
                        config_location,
                        provider,
                        resource_type,
                    });
                }
                Err(ResolveError::MissingAttribute { attribute, .. }) => {
                    tracing::warn!(
                        "Attribute '{}' missing, skipping {}",
                        attribute,
                        config_location
                    );
                    batch.warnings.push(RunWarning::MissingFormatAttribute {
                        config_location,
                        attribute,
                    });
                }
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{ImportLocationFormat, Provider};
    use crate::test_helpers::observed_record;

    fn table() -> ImportFormatTable {
        let mut table = ImportFormatTable::new();
        table
            .insert(Provider::Aws, "aws_vpc", ImportLocationFormat::new("$0", &["id"]))
            .unwrap();
        table
            .insert(
                Provider::Google,
                "google_storage_bucket",
                ImportLocationFormat::new("$0/$1", &["project", "name"]),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_one_missing_rule_does_not_block_the_batch() {
        let mut unmanaged: Vec<ObservedResourceRecord> = (0..9)
            .map(|i| {
                let id = format!("vpc-{}", i);
                observed_record(
                    Provider::Aws,
                    "aws_vpc",
                    &format!("tfer--{}", id),
                    &[("id", id.as_str())],
                )
            })
            .collect();
        unmanaged.push(observed_record(
            Provider::Aws,
            "aws_lightsail_instance",
            "tfer--box",
            &[("id", "box")],
        ));

        let table = table();
        let batch = MigrationGenerator::new(&table).generate(&unmanaged);

        assert_eq!(batch.len(), 9);
        assert_eq!(
            batch.warnings,
            vec![RunWarning::NoFormatRule {
                config_location: "aws_lightsail_instance.box".to_string(),
                provider: "aws".to_string(),
                resource_type: "aws_lightsail_instance".to_string(),
            }]
        );
        assert_eq!(
            batch.migrations["aws_vpc.vpc_3"].remote_reference.as_str(),
            "vpc-3"
        );
    }

    #[test]
    fn test_missing_attribute_is_skipped() {
        let unmanaged = vec![
            observed_record(
                Provider::Google,
                "google_storage_bucket",
                "tfer--logs",
                &[("project", "p1"), ("name", "logs")],
            ),
            observed_record(
                Provider::Google,
                "google_storage_bucket",
                "tfer--orphan",
                &[("project", "p1")],
            ),
        ];

        let table = table();
        let batch = MigrationGenerator::new(&table).generate(&unmanaged);

        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.migrations["google_storage_bucket.logs"]
                .remote_reference
                .as_str(),
            "p1/logs"
        );
        assert_eq!(
            batch.warnings,
            vec![RunWarning::MissingFormatAttribute {
                config_location: "google_storage_bucket.orphan".to_string(),
                attribute: "name".to_string(),
            }]
        );
    }

    #[test]
    fn test_descriptor_field_names() {
        let unmanaged = vec![observed_record(
            Provider::Aws,
            "aws_vpc",
            "tfer--orphan-vpc",
            &[("id", "vpc-0f1e2d")],
        )];

        let table = table();
        let batch = MigrationGenerator::new(&table).generate(&unmanaged);
        let json = serde_json::to_value(&batch.migrations).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "aws_vpc.orphan_vpc": {
                    "TerraformConfigLocation": "aws_vpc.orphan_vpc",
                    "RemoteCloudReference": "vpc-0f1e2d"
                }
            })
        );
    }
}
