//! Reconciliation of desired against observed state
//!
//! Matches records by composite key and sorts every resource into exactly
//! one bucket:
//!
//! - **Deleted**: declared in desired state, not found by the scan
//! - **Drifted**: on both sides, with a tracked attribute that differs
//! - **Unmanaged**: found by the scan, not declared anywhere
//! - **Unchanged**: on both sides and equal (counted, not kept)

mod actions;
mod engine;
mod rules;
mod types;

pub use actions::{CloudAction, ResourceActionRecord, ResourceActions};
pub use engine::{DeletedScope, Reconciler};
pub use rules::{AttributePattern, DriftRuleTable, DriftRules, FieldChange, UntrackedTypes};
pub use types::{
    AttributeDifference, DeletedResource, DriftedResource, DuplicatePolicy, ReconciliationResult,
};
