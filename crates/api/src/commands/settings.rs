//! Settings commands

use afasa_core::resources::{mutations, queries, AiSettings};
use afasa_core::QuerySnapshot;
use afasa_domain::{ConsoleError, Result};
use serde_json::Value;

use super::{mutate, read};
use crate::context::ConsoleContext;
use crate::utils::execute_command;

/// Upper bound accepted for `max_daily_rule_changes`
pub const MAX_DAILY_RULE_CHANGES: u32 = 100;

const AI_RULE_CREATION_MODES: [&str; 3] = ["off", "suggest_only", "auto_apply"];

pub async fn get_settings(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
    execute_command("settings::get_settings", || async { read(ctx, &queries::settings()).await }).await
}

/// Save AI automation settings
///
/// # Errors
/// `InvalidInput` for an unknown creation mode or an out-of-range limit;
/// nothing is sent in that case.
pub async fn update_ai_settings(ctx: &ConsoleContext, settings: &AiSettings) -> Result<Value> {
    execute_command("settings::update_ai_settings", || async {
        if !AI_RULE_CREATION_MODES.contains(&settings.ai_rule_creation.as_str()) {
            return Err(ConsoleError::InvalidInput(format!(
                "unknown ai_rule_creation mode: {}",
                settings.ai_rule_creation
            )));
        }
        if settings.max_daily_rule_changes > MAX_DAILY_RULE_CHANGES {
            return Err(ConsoleError::InvalidInput(format!(
                "max_daily_rule_changes must be at most {MAX_DAILY_RULE_CHANGES}"
            )));
        }
        mutate(ctx, mutations::update_ai_settings(settings)).await
    })
    .await
}
