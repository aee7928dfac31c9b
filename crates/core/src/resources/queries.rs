//! Read-side resource definitions

use afasa_domain::constants::{
    RESOURCE_AUDIT, RESOURCE_DEVICES, RESOURCE_ME, RESOURCE_PROPOSALS, RESOURCE_REPORTS,
    RESOURCE_SETTINGS, RESOURCE_SNAPSHOTS, RESOURCE_TASKS,
};
use afasa_domain::{query_key, ApiRequest, QueryKey};

/// Number of media snapshots shown on the dashboard
pub const RECENT_SNAPSHOT_LIMIT: u32 = 10;

/// Default page size for the audit log
pub const DEFAULT_AUDIT_LIMIT: u32 = 50;

/// A cacheable backend read
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDef {
    pub key: QueryKey,
    pub request: ApiRequest,
}

impl QueryDef {
    pub fn new(key: QueryKey, request: ApiRequest) -> Self {
        Self { key, request }
    }

    /// Resource class used to look up the TTL
    pub fn resource_class(&self) -> &str {
        self.key.resource_class().unwrap_or_default()
    }
}

pub fn tasks() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_TASKS], ApiRequest::get("/api/ops/tasks"))
}

pub fn open_tasks() -> QueryDef {
    QueryDef::new(
        query_key![RESOURCE_TASKS, "open"],
        ApiRequest::get("/api/ops/tasks").with_query("status", "open"),
    )
}

pub fn proposals() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_PROPOSALS], ApiRequest::get("/api/ops/rules/proposals"))
}

pub fn pending_proposals() -> QueryDef {
    QueryDef::new(
        query_key![RESOURCE_PROPOSALS, "pending"],
        ApiRequest::get("/api/ops/rules/proposals").with_query("status", "pending"),
    )
}

pub fn recent_snapshots() -> QueryDef {
    QueryDef::new(
        query_key![RESOURCE_SNAPSHOTS],
        ApiRequest::get("/api/media/snapshots").with_query("limit", RECENT_SNAPSHOT_LIMIT),
    )
}

pub fn devices() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_DEVICES], ApiRequest::get("/api/devices"))
}

pub fn settings() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_SETTINGS], ApiRequest::get("/api/settings"))
}

pub fn reports() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_REPORTS], ApiRequest::get("/api/report/reports"))
}

/// Audit log page; the limit is part of the key so pages are cached apart
pub fn audit(limit: u32) -> QueryDef {
    QueryDef::new(
        query_key![RESOURCE_AUDIT, limit],
        ApiRequest::get("/api/audit").with_query("limit", limit),
    )
}

pub fn current_user() -> QueryDef {
    QueryDef::new(query_key![RESOURCE_ME], ApiRequest::get("/api/me"))
}
