//! Local names and composite keys
//!
//! The scanner names every resource `tfer--<something>` and keeps whatever
//! separators the cloud used. Terraform configuration needs plain identifiers,
//! and both snapshots must agree on a resource's key, so every raw name goes
//! through [`normalize`] before it is used for matching.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix the scanner adds to every generated resource name
pub const SCANNER_PREFIX: &str = "tfer--";

lazy_static! {
    static ref NON_IDENTIFIER_CHARS: Regex =
        Regex::new(r"[^A-Za-z0-9_]").expect("Invalid identifier regex");
}

/// Convert a raw resource name into a legal Terraform identifier.
///
/// Removes the scanner prefix and rewrites every character outside
/// `[A-Za-z0-9_]` to an underscore. Names that would start with a digit get
/// a leading underscore. Applying it twice yields the same result as once.
pub fn normalize(raw_name: &str) -> String {
    let without_prefix = raw_name.replace(SCANNER_PREFIX, "");
    let mut name = NON_IDENTIFIER_CHARS
        .replace_all(&without_prefix, "_")
        .into_owned();

    if name.is_empty() {
        return "_".to_string();
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    name
}

/// Identity used to match one resource across the desired and observed snapshots.
///
/// Always `{resource_type}.{normalize(raw_name)}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(String);

impl CompositeKey {
    pub fn new(resource_type: &str, raw_name: &str) -> Self {
        Self(format!("{}.{}", resource_type, normalize(raw_name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
