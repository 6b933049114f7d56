use thiserror::Error;

use crate::identity::CompositeKey;

/// Fatal errors that abort a reconciliation run
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A snapshot file could not be read
    #[error("Failed to read {kind} snapshot '{path}': {message}")]
    SnapshotRead {
        kind: SnapshotKind,
        path: String,
        message: String,
    },

    /// A snapshot file is not valid JSON or does not have the expected shape
    #[error("Failed to parse {kind} snapshot '{path}': {source}")]
    SnapshotParse {
        kind: SnapshotKind,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single resource entry inside a desired snapshot is malformed
    #[error("Malformed resource #{index} in desired snapshot '{path}': {source}")]
    DesiredRecord {
        path: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The same composite key was produced twice and duplicates are rejected
    #[error("Duplicate identity '{key}' in {side} state ({first} and {second})")]
    DuplicateIdentity {
        key: CompositeKey,
        side: SnapshotKind,
        first: String,
        second: String,
    },

    /// An import-format table entry breaks the placeholder invariant
    #[error("Invalid import format for {provider}/{resource_type}: {message}")]
    InvalidFormat {
        provider: String,
        resource_type: String,
        message: String,
    },

    /// An import-format or drift-rule table could not be parsed
    #[error("Failed to parse table '{name}': {message}")]
    TableParse { name: String, message: String },

    /// An output artifact could not be written
    #[error("Failed to write '{path}': {message}")]
    OutputWrite { path: String, message: String },
}

/// Which side of the reconciliation a snapshot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Desired,
    Observed,
    Actions,
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotKind::Desired => write!(f, "desired"),
            SnapshotKind::Observed => write!(f, "observed"),
            SnapshotKind::Actions => write!(f, "cloud actions"),
        }
    }
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
