//! Catalog of the console's backend resources
//!
//! Queries name a cache key and the GET request that fills it; mutations
//! name the write, the key prefixes to invalidate and an optional
//! optimistic patch.

pub mod mutations;
pub mod patches;
pub mod queries;
pub mod service;

pub use mutations::{AiSettings, ReportRequest};
pub use queries::QueryDef;
pub use service::ResourceService;
