//! # AFASA Domain
//!
//! Domain types shared by every layer of the AFASA console.
//!
//! This crate contains:
//! - Query keys and backend request descriptions
//! - The error taxonomy (`ApiError`, `AuthenticationError`, `ConsoleError`)
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other AFASA crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
