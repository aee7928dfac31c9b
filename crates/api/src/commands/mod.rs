//! Console commands - workflow entry points over the sync layer
//!
//! Reads return a [`QuerySnapshot`] even when the fetch failed, so callers can
//! show the last known value next to the error. Only a lost session is
//! returned as `Err`.

mod audit;
mod dashboard;
mod devices;
mod proposals;
mod reports;
mod session;
mod settings;
mod tasks;

pub use audit::*;
pub use dashboard::*;
pub use devices::*;
pub use proposals::*;
pub use reports::*;
pub use session::*;
pub use settings::*;
pub use tasks::*;

use afasa_core::resources::QueryDef;
use afasa_core::{Mutation, QuerySnapshot};
use afasa_domain::Result;
use serde_json::Value;

use crate::context::ConsoleContext;
use crate::utils::require_session;

async fn read(ctx: &ConsoleContext, query: &QueryDef) -> Result<QuerySnapshot> {
    require_session(ctx.resources.read(query).await)
}

async fn refresh(ctx: &ConsoleContext, query: &QueryDef) -> Result<QuerySnapshot> {
    require_session(ctx.resources.refresh(query).await)
}

async fn mutate(ctx: &ConsoleContext, mutation: Mutation) -> Result<Value> {
    Ok(ctx.mutations.mutate(mutation).await?)
}
