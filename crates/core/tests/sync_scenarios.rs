//! Integration tests for cache and mutation reconciliation
//!
//! Drives `ResourceService` and `MutationExecutor` over a scripted in-memory
//! backend through the console's approve and complete workflows.

mod support;

use std::sync::Arc;
use std::time::Duration;

use afasa_core::resources::{mutations, queries};
use afasa_core::{MutationExecutor, QueryCache, ResourceService};
use afasa_domain::{ApiError, CacheSettings, QueryStatus};
use parking_lot::Mutex;
use serde_json::{json, Value};
use support::StubApi;

const PENDING: &str = "GET /api/ops/rules/proposals?status=pending";
const ALL_PROPOSALS: &str = "GET /api/ops/rules/proposals";
const OPEN_TASKS: &str = "GET /api/ops/tasks?status=open";
const ALL_TASKS: &str = "GET /api/ops/tasks";

fn proposal(id: &str, status: &str) -> Value {
    json!({ "id": id, "title": format!("Rule {id}"), "status": status })
}

fn wire(api: &Arc<StubApi>) -> (ResourceService, MutationExecutor) {
    let cache = QueryCache::new(Duration::from_secs(30));
    let resources = ResourceService::new(api.clone(), cache.clone(), CacheSettings::default());
    let executor = MutationExecutor::new(api.clone(), cache);
    (resources, executor)
}

fn ids(data: Option<Value>) -> Vec<String> {
    data.and_then(|value| value.as_array().cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item["id"].as_str().map(str::to_string))
        .collect()
}

/// Validates the approve workflow end to end.
///
/// Assertions:
/// - The approval is sent as `POST /api/ops/rules/proposals/p1/approve`.
/// - Subscribers to the pending list see `p1` removed before the response.
/// - Both `["proposals"]` and `["proposals","pending"]` are invalidated.
/// - The next read of the pending list re-fetches and excludes `p1`.
#[tokio::test]
async fn test_approve_pending_proposal_end_to_end() {
    let api = Arc::new(StubApi::new());
    api.respond(PENDING, Ok(json!([proposal("p1", "pending"), proposal("p2", "pending")])));
    api.respond(ALL_PROPOSALS, Ok(json!([proposal("p1", "pending"), proposal("p2", "pending")])));
    api.respond("POST /api/ops/rules/proposals/p1/approve", Ok(json!({ "status": "approved" })));
    api.delay("POST /api/ops/rules/proposals/p1/approve", Duration::from_millis(20));
    let (resources, executor) = wire(&api);

    let pending = queries::pending_proposals();
    let all = queries::proposals();
    resources.read(&pending).await;
    resources.read(&all).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = resources.subscribe(&pending, move |snapshot| sink.lock().push(ids(snapshot.data.clone())));

    api.respond(PENDING, Ok(json!([proposal("p2", "pending")])));
    executor.mutate(mutations::approve_proposal("p1")).await.unwrap();

    assert_eq!(api.call_count("POST /api/ops/rules/proposals/p1/approve"), 1);
    assert_eq!(seen.lock().first().cloned(), Some(vec!["p2".to_string()]));
    assert_eq!(resources.cache().peek(&pending.key).unwrap().status, QueryStatus::Stale);
    assert_eq!(resources.cache().peek(&all.key).unwrap().status, QueryStatus::Stale);

    let refreshed = resources.read(&pending).await;
    assert_eq!(api.call_count(PENDING), 2);
    assert_eq!(ids(refreshed.data), vec!["p2".to_string()]);
    assert_eq!(refreshed.status, QueryStatus::Fresh);
}

/// Validates the invalidation cascade after completing a task.
///
/// Assertions:
/// - Completing a task re-fetches both `["tasks"]` and `["tasks","open"]` on
///   their next read instead of serving cached data.
#[tokio::test]
async fn test_complete_task_invalidates_all_task_lists() {
    let api = Arc::new(StubApi::new());
    let task = json!({ "id": "t1", "title": "Check pump", "status": "open" });
    api.respond(OPEN_TASKS, Ok(json!([task.clone()])));
    api.respond(ALL_TASKS, Ok(json!([task])));
    api.respond("POST /api/ops/tasks/t1/complete", Ok(Value::Null));
    let (resources, executor) = wire(&api);

    resources.read(&queries::open_tasks()).await;
    resources.read(&queries::tasks()).await;
    resources.read(&queries::open_tasks()).await;
    assert_eq!(api.call_count(OPEN_TASKS), 1);

    api.respond(OPEN_TASKS, Ok(json!([])));
    api.respond(ALL_TASKS, Ok(json!([{ "id": "t1", "title": "Check pump", "status": "done" }])));
    executor.mutate(mutations::complete_task("t1")).await.unwrap();

    let open = resources.read(&queries::open_tasks()).await;
    let all = resources.read(&queries::tasks()).await;

    assert_eq!(api.call_count(OPEN_TASKS), 2);
    assert_eq!(api.call_count(ALL_TASKS), 2);
    assert_eq!(open.data, Some(json!([])));
    assert_eq!(all.data.unwrap()[0]["status"], "done");
}

/// Validates that overlapping mutations roll back independently.
///
/// Assertions:
/// - When approving `p1` fails after rejecting `p2` succeeded, only the
///   approval's patch is reverted: `p1` is back, `p2` stays removed.
/// - The failed call's error reaches its caller.
#[tokio::test]
async fn test_overlapping_mutations_roll_back_independently() {
    let api = Arc::new(StubApi::new());
    api.respond(
        PENDING,
        Ok(json!([proposal("p1", "pending"), proposal("p2", "pending"), proposal("p3", "pending")])),
    );
    api.respond("POST /api/ops/rules/proposals/p1/approve", Err(ApiError::http(409, "conflict")));
    api.delay("POST /api/ops/rules/proposals/p1/approve", Duration::from_millis(60));
    api.respond("POST /api/ops/rules/proposals/p2/reject", Ok(Value::Null));
    api.delay("POST /api/ops/rules/proposals/p2/reject", Duration::from_millis(10));
    let (resources, executor) = wire(&api);
    let pending = queries::pending_proposals();
    resources.read(&pending).await;

    let (approve, reject) = tokio::join!(
        executor.mutate(mutations::approve_proposal("p1")),
        executor.mutate(mutations::reject_proposal("p2")),
    );

    assert_eq!(approve.unwrap_err(), ApiError::http(409, "conflict"));
    assert!(reject.is_ok());
    let snapshot = resources.cache().peek(&pending.key).unwrap();
    assert_eq!(ids(snapshot.data), vec!["p1".to_string(), "p3".to_string()]);
    assert!(executor.pending().is_empty());
}

/// Validates that a committed patch yields to the next real fetch.
///
/// Assertions:
/// - After a successful reject, the re-fetched server list is shown as is,
///   even when it still contains the rejected proposal.
#[tokio::test]
async fn test_committed_patch_superseded_by_refetch() {
    let api = Arc::new(StubApi::new());
    api.respond(PENDING, Ok(json!([proposal("p1", "pending"), proposal("p2", "pending")])));
    api.respond("POST /api/ops/rules/proposals/p2/reject", Ok(Value::Null));
    let (resources, executor) = wire(&api);
    let pending = queries::pending_proposals();
    resources.read(&pending).await;

    executor.mutate(mutations::reject_proposal("p2")).await.unwrap();
    assert_eq!(ids(resources.cache().peek(&pending.key).unwrap().data), vec!["p1".to_string()]);

    let refetched = resources.read(&pending).await;
    assert_eq!(ids(refetched.data), vec!["p1".to_string(), "p2".to_string()]);
}

/// Validates that failed reads keep the last good value.
///
/// Assertions:
/// - After a 503 on re-fetch the status is `error` and the previous list is
///   still available for display.
/// - A later successful refresh clears the error.
#[tokio::test]
async fn test_read_failure_keeps_last_known_value() {
    let api = Arc::new(StubApi::new());
    api.respond("GET /api/devices", Ok(json!([{ "id": "d1", "name": "Sensor A" }])));
    let (resources, _) = wire(&api);
    let devices = queries::devices();
    resources.read(&devices).await;

    api.respond_once("GET /api/devices", Err(ApiError::http(503, "maintenance")));
    let failed = resources.refresh(&devices).await;
    assert_eq!(failed.status, QueryStatus::Error);
    assert_eq!(ids(failed.data.clone()), vec!["d1".to_string()]);

    let recovered = resources.refresh(&devices).await;
    assert_eq!(recovered.status, QueryStatus::Fresh);
    assert!(recovered.error.is_none());
}
