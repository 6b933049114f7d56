use std::fmt;

use crate::error::SnapshotKind;
use crate::identity::CompositeKey;

/// A record-level problem that was skipped rather than aborting the run.
///
/// Warnings are collected while the pipeline runs and reported once it
/// finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunWarning {
    /// An observed resource entry lacks a required field and was skipped
    ObservedMissingField {
        snapshot: String,
        index: usize,
        field: &'static str,
    },

    /// Two records produced the same key; the first one was kept
    DuplicateIdentity {
        key: CompositeKey,
        side: SnapshotKind,
        kept: String,
        dropped: String,
    },

    /// No tracked-attribute rule exists, so drift cannot be evaluated
    NoDriftRule { resource_type: String },

    /// No import-format rule exists, so the resource cannot be imported
    NoFormatRule {
        config_location: String,
        provider: String,
        resource_type: String,
    },

    /// The import format needs an attribute the resource does not have
    MissingFormatAttribute {
        config_location: String,
        attribute: String,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::ObservedMissingField {
                snapshot,
                index,
                field,
            } => {
                write!(
                    f,
                    "Skipped resource #{} in {}: missing '{}'",
                    index, snapshot, field
                )
            }
            RunWarning::DuplicateIdentity {
                key,
                side,
                kept,
                dropped,
            } => {
                write!(
                    f,
                    "Duplicate {} identity '{}': kept {}, ignored {}",
                    side, key, kept, dropped
                )
            }
            RunWarning::NoDriftRule { resource_type } => {
                write!(
                    f,
                    "No tracked attributes for '{}': drift not evaluated",
                    resource_type
                )
            }
            RunWarning::NoFormatRule {
                config_location,
                provider,
                resource_type,
            } => {
                write!(
                    f,
                    "Cannot import {}: no import format for '{}' ({})",
                    config_location, resource_type, provider
                )
            }
            RunWarning::MissingFormatAttribute {
                config_location,
                attribute,
            } => {
                write!(
                    f,
                    "Cannot import {}: missing attribute '{}'",
                    config_location, attribute
                )
            }
        }
    }
}
