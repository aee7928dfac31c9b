//! Device inventory commands

use afasa_core::resources::{mutations, queries};
use afasa_core::QuerySnapshot;
use afasa_domain::Result;
use serde_json::Value;

use super::{mutate, read, refresh};
use crate::context::ConsoleContext;
use crate::utils::{execute_command, require_id};

pub async fn list_devices(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
    execute_command("devices::list_devices", || async { read(ctx, &queries::devices()).await }).await
}

/// Re-fetch the inventory even if the cached copy is fresh
pub async fn refresh_devices(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
    execute_command("devices::refresh_devices", || async { refresh(ctx, &queries::devices()).await })
        .await
}

pub async fn set_device_enabled(ctx: &ConsoleContext, device_id: &str, enabled: bool) -> Result<Value> {
    execute_command("devices::set_device_enabled", || async {
        let id = require_id("device id", device_id)?;
        mutate(ctx, mutations::set_device_enabled(id, enabled)).await
    })
    .await
}
