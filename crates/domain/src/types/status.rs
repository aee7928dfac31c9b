//! Lifecycle states for cache entries and mutations

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Observable state of a cache entry
///
/// `Fetching` is reported whenever a fetch is in flight for the key, even if
/// older data is still being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Fresh,
    Stale,
    Fetching,
    Error,
}

impl_domain_status_conversions!(QueryStatus {
    Fresh => "fresh",
    Stale => "stale",
    Fetching => "fetching",
    Error => "error",
});

/// Settlement state of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Pending,
    Committed,
    RolledBack,
}

impl_domain_status_conversions!(MutationStatus {
    Pending => "pending",
    Committed => "committed",
    RolledBack => "rolled_back",
});
