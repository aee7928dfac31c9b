//! Client-side synchronisation with the backend
//!
//! [`QueryCache`] holds server state per [`afasa_domain::QueryKey`];
//! [`MutationExecutor`] runs writes through an [`ApiPort`] and reconciles the
//! cache afterwards.

pub mod mutation;
pub mod ports;
pub mod query_cache;

pub use mutation::{Mutation, MutationExecutor, MutationRecord};
pub use ports::ApiPort;
pub use query_cache::{
    fetcher_fn, FetchFuture, Fetcher, Listener, Patch, QueryCache, QuerySnapshot, Subscription,
};
