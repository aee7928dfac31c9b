//! Dashboard commands

use afasa_core::resources::queries;
use afasa_core::QuerySnapshot;
use afasa_domain::Result;

use super::read;
use crate::context::ConsoleContext;
use crate::utils::execute_command;

/// The three panels shown on the landing page
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub open_tasks: QuerySnapshot,
    pub pending_proposals: QuerySnapshot,
    pub recent_snapshots: QuerySnapshot,
}

/// Load every dashboard panel concurrently
///
/// # Errors
/// Only when a panel was rejected for lack of a session.
pub async fn load_dashboard(ctx: &ConsoleContext) -> Result<DashboardView> {
    execute_command("dashboard::load_dashboard", || async {
        let open_tasks = queries::open_tasks();
        let pending_proposals = queries::pending_proposals();
        let recent_snapshots = queries::recent_snapshots();

        let (open_tasks, pending_proposals, recent_snapshots) = tokio::join!(
            read(ctx, &open_tasks),
            read(ctx, &pending_proposals),
            read(ctx, &recent_snapshots),
        );

        Ok(DashboardView {
            open_tasks: open_tasks?,
            pending_proposals: pending_proposals?,
            recent_snapshots: recent_snapshots?,
        })
    })
    .await
}
