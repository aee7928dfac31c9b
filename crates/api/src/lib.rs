//! # AFASA Console
//!
//! Application layer of the operator console.
//!
//! This crate contains:
//! - Console commands (dashboard, tasks, proposals, devices, settings,
//!   reports, audit, session)
//! - The console context (dependency injection)
//! - Tracing setup and command logging helpers
//!
//! ## Architecture
//! - Depends on `domain`, `common`, `core`, and `infra`
//! - Wires the token source, API client, query cache and mutation executor
//!   together

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
