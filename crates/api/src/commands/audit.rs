//! Audit log commands

use afasa_core::resources::queries::{self, DEFAULT_AUDIT_LIMIT};
use afasa_core::QuerySnapshot;
use afasa_domain::{ConsoleError, Result};

use super::read;
use crate::context::ConsoleContext;
use crate::utils::execute_command;

pub const MAX_AUDIT_LIMIT: u32 = 500;

/// Most recent audit entries, `limit` defaulting to 50
pub async fn list_audit(ctx: &ConsoleContext, limit: Option<u32>) -> Result<QuerySnapshot> {
    execute_command("audit::list_audit", || async {
        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
        if limit == 0 || limit > MAX_AUDIT_LIMIT {
            return Err(ConsoleError::InvalidInput(format!("audit limit must be 1..={MAX_AUDIT_LIMIT}")));
        }
        read(ctx, &queries::audit(limit)).await
    })
    .await
}
