//! Operations task commands

use afasa_core::resources::{mutations, queries};
use afasa_core::QuerySnapshot;
use afasa_domain::Result;
use serde_json::Value;

use super::{mutate, read};
use crate::context::ConsoleContext;
use crate::utils::{execute_command, require_id};

/// Task list, optionally restricted to open tasks
pub async fn list_tasks(ctx: &ConsoleContext, open_only: bool) -> Result<QuerySnapshot> {
    execute_command("tasks::list_tasks", || async {
        let query = if open_only { queries::open_tasks() } else { queries::tasks() };
        read(ctx, &query).await
    })
    .await
}

/// Mark a task done
///
/// The task leaves every cached open list immediately and comes back if the
/// backend rejects the change.
pub async fn complete_task(ctx: &ConsoleContext, task_id: &str) -> Result<Value> {
    execute_command("tasks::complete_task", || async {
        let id = require_id("task id", task_id)?;
        mutate(ctx, mutations::complete_task(id)).await
    })
    .await
}
