//! Report commands

use afasa_core::resources::{mutations, queries, ReportRequest};
use afasa_core::QuerySnapshot;
use afasa_domain::{ConsoleError, Result};
use serde_json::Value;

use super::{mutate, read};
use crate::context::ConsoleContext;
use crate::utils::execute_command;

const REPORT_FORMATS: [&str; 2] = ["pdf", "csv"];

pub async fn list_reports(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
    execute_command("reports::list_reports", || async { read(ctx, &queries::reports()).await }).await
}

/// Ask the backend to generate a report
///
/// # Errors
/// `InvalidInput` for a blank type or unsupported format.
pub async fn generate_report(ctx: &ConsoleContext, request: &ReportRequest) -> Result<Value> {
    execute_command("reports::generate_report", || async {
        if request.report_type.trim().is_empty() {
            return Err(ConsoleError::InvalidInput("report type must not be empty".into()));
        }
        if !REPORT_FORMATS.contains(&request.format.as_str()) {
            return Err(ConsoleError::InvalidInput(format!("unsupported report format: {}", request.format)));
        }
        mutate(ctx, mutations::generate_report(request)).await
    })
    .await
}
