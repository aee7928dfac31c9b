//! # AFASA Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The HTTP transport (per-attempt timeout, bounded network retry)
//! - The authenticated backend client implementing `afasa_core::ApiPort`
//! - Configuration loading from the environment and config files
//!
//! ## Architecture
//! - Implements traits defined in `afasa-core`
//! - Depends on `afasa-common` for the token lifecycle
//! - Contains all "impure" code (network and filesystem I/O)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
