//! Resource identity resolution
//!
//! Turns provider-specific resource descriptions into the identities the rest
//! of the pipeline works with:
//!
//! - **Composite keys** (`aws_s3_bucket.my_bucket`) used to match a resource
//!   across the desired and observed snapshots
//! - **Canonical references** (`projects/p1/global/networks/vpc`) a provider
//!   accepts in `terraform import`
//! - **Observed ids**, the value downstream consumers use to look a live
//!   resource up
//!
//! Nothing in this module performs I/O.

mod error;
mod formats;
mod normalize;
mod provider;
mod strategy;

use std::collections::BTreeMap;

pub use error::ResolveError;
pub use formats::{CanonicalReference, ImportFormatTable, ImportLocationFormat};
pub use normalize::{CompositeKey, normalize};
pub use provider::{Provider, provider_short_name};
pub use strategy::{GoogleStrategy, ProviderStrategies};

/// Flat attribute name -> string value mapping for one resource instance
pub type AttributeSet = BTreeMap<String, String>;
