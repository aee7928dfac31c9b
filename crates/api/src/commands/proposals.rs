//! Automation-rule proposal commands

use afasa_core::resources::{mutations, queries};
use afasa_core::QuerySnapshot;
use afasa_domain::Result;
use serde_json::Value;

use super::{mutate, read};
use crate::context::ConsoleContext;
use crate::utils::{execute_command, require_id};

/// AI-proposed rules, optionally only those awaiting a decision
pub async fn list_proposals(ctx: &ConsoleContext, pending_only: bool) -> Result<QuerySnapshot> {
    execute_command("proposals::list_proposals", || async {
        let query = if pending_only { queries::pending_proposals() } else { queries::proposals() };
        read(ctx, &query).await
    })
    .await
}

pub async fn approve_proposal(ctx: &ConsoleContext, proposal_id: &str) -> Result<Value> {
    execute_command("proposals::approve_proposal", || async {
        let id = require_id("proposal id", proposal_id)?;
        mutate(ctx, mutations::approve_proposal(id)).await
    })
    .await
}

pub async fn reject_proposal(ctx: &ConsoleContext, proposal_id: &str) -> Result<Value> {
    execute_command("proposals::reject_proposal", || async {
        let id = require_id("proposal id", proposal_id)?;
        mutate(ctx, mutations::reject_proposal(id)).await
    })
    .await
}
