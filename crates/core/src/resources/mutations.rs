//! Write-side resource definitions

use afasa_domain::constants::{
    RESOURCE_DEVICES, RESOURCE_PROPOSALS, RESOURCE_REPORTS, RESOURCE_SETTINGS, RESOURCE_TASKS,
};
use afasa_domain::{query_key, ApiRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::patches::{merge_object, set_field, transition_status};
use crate::sync::Mutation;

pub const TASK_STATUS_DONE: &str = "done";
pub const PROPOSAL_STATUS_APPROVED: &str = "approved";
pub const PROPOSAL_STATUS_REJECTED: &str = "rejected";

/// AI automation settings editable from the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    /// e.g. `off`, `suggest_only`, `auto_apply`
    pub ai_rule_creation: String,
    pub max_daily_rule_changes: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self { ai_rule_creation: "suggest_only".to_string(), max_daily_rule_changes: 3 }
    }
}

/// Report generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(rename = "type")]
    pub report_type: String,
    #[serde(default = "default_report_format")]
    pub format: String,
}

impl ReportRequest {
    pub fn pdf(report_type: impl Into<String>) -> Self {
        Self { report_type: report_type.into(), format: default_report_format() }
    }
}

fn default_report_format() -> String {
    "pdf".to_string()
}

pub fn complete_task(id: &str) -> Mutation {
    Mutation {
        request: ApiRequest::post(format!("/api/ops/tasks/{id}/complete")),
        targets: vec![query_key![RESOURCE_TASKS]],
        optimistic: Some(transition_status(id, TASK_STATUS_DONE)),
    }
}

pub fn approve_proposal(id: &str) -> Mutation {
    decide_proposal(id, "approve", PROPOSAL_STATUS_APPROVED)
}

pub fn reject_proposal(id: &str) -> Mutation {
    decide_proposal(id, "reject", PROPOSAL_STATUS_REJECTED)
}

fn decide_proposal(id: &str, action: &str, status: &str) -> Mutation {
    Mutation {
        request: ApiRequest::post(format!("/api/ops/rules/proposals/{id}/{action}")),
        targets: vec![query_key![RESOURCE_PROPOSALS]],
        optimistic: Some(transition_status(id, status)),
    }
}

pub fn set_device_enabled(id: &str, enabled: bool) -> Mutation {
    let action = if enabled { "enable" } else { "disable" };
    Mutation {
        request: ApiRequest::post(format!("/api/devices/{id}/{action}")),
        targets: vec![query_key![RESOURCE_DEVICES]],
        optimistic: Some(set_field(id, "enabled", Value::Bool(enabled))),
    }
}

pub fn update_ai_settings(settings: &AiSettings) -> Mutation {
    let body = json!({
        "ai_rule_creation": settings.ai_rule_creation,
        "max_daily_rule_changes": settings.max_daily_rule_changes,
    });
    Mutation {
        request: ApiRequest::post("/api/settings/ai").with_body(body.clone()),
        targets: vec![query_key![RESOURCE_SETTINGS]],
        optimistic: Some(merge_object(body)),
    }
}

/// Reports are produced asynchronously, so there is nothing to patch
pub fn generate_report(request: &ReportRequest) -> Mutation {
    Mutation::new(
        ApiRequest::post("/api/report/generate")
            .with_body(json!({ "type": request.report_type, "format": request.format })),
        [query_key![RESOURCE_REPORTS]],
    )
}
