//! # AFASA Core
//!
//! Client-side synchronisation logic - no HTTP or platform code.
//!
//! This crate contains:
//! - The [`sync::ApiPort`] through which every backend call flows
//! - [`sync::QueryCache`]: TTL-aware, coalescing store of server state
//! - [`sync::MutationExecutor`]: writes with optimistic patch and rollback
//! - The [`resources`] catalog of console queries and mutations
//!
//! ## Architecture Principles
//! - Depends only on `afasa-domain` and `afasa-common`
//! - The backend is reached through a trait, so everything here is testable
//!   with an in-memory port

pub mod resources;
pub mod sync;

pub use resources::{QueryDef, ResourceService};
pub use sync::{
    ApiPort, Mutation, MutationExecutor, MutationRecord, QueryCache, QuerySnapshot, Subscription,
};
