//! Domain types and models

pub mod query_key;
pub mod request;
pub mod status;

pub use query_key::{KeyPart, QueryKey};
pub use request::{ApiRequest, HttpMethod};
pub use status::{MutationStatus, QueryStatus};
