//! State-changing backend operations reconciled against the query cache

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use afasa_domain::{ApiError, ApiRequest, MutationStatus, QueryKey};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ports::ApiPort;
use super::query_cache::{Patch, QueryCache};

/// A backend write plus the cache keys it affects
#[derive(Clone)]
pub struct Mutation {
    pub request: ApiRequest,
    /// Prefixes invalidated after the write succeeds
    pub targets: Vec<QueryKey>,
    /// Provisional change applied to cached data while the write is pending
    pub optimistic: Option<Patch>,
}

impl Mutation {
    pub fn new(request: ApiRequest, targets: impl IntoIterator<Item = QueryKey>) -> Self {
        Self { request, targets: targets.into_iter().collect(), optimistic: None }
    }

    pub fn with_optimistic<F>(mut self, patch: F) -> Self
    where
        F: Fn(&QueryKey, &Value) -> Value + Send + Sync + 'static,
    {
        self.optimistic = Some(Arc::new(patch));
        self
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("request", &self.request)
            .field("targets", &self.targets)
            .field("optimistic", &self.optimistic.is_some())
            .finish()
    }
}

/// Bookkeeping for a mutation that has not settled yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRecord {
    pub id: Uuid,
    pub target_keys: Vec<QueryKey>,
    pub status: MutationStatus,
}

type PendingMap = Arc<Mutex<HashMap<Uuid, MutationRecord>>>;

/// Runs mutations through the API port and reconciles the cache
///
/// Each mutation owns its optimistic layer, so a failure rolls back only its
/// own change even when other mutations touch the same keys.
#[derive(Clone)]
pub struct MutationExecutor {
    api: Arc<dyn ApiPort>,
    cache: QueryCache,
    pending: PendingMap,
}

impl MutationExecutor {
    pub fn new(api: Arc<dyn ApiPort>, cache: QueryCache) -> Self {
        Self { api, cache, pending: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Mutations still waiting on the backend
    pub fn pending(&self) -> Vec<MutationRecord> {
        self.pending.lock().values().cloned().collect()
    }

    /// Execute `mutation`
    ///
    /// 1. Apply the optimistic patch (if any) to cached entries under the
    ///    targets and notify their subscribers.
    /// 2. Send the request.
    /// 3. On success invalidate every target prefix; on failure remove the
    ///    patch again and return the error.
    ///
    /// Dropping the returned future before it settles also removes the patch.
    pub async fn mutate(&self, mutation: Mutation) -> Result<Value, ApiError> {
        let Mutation { request, targets, optimistic } = mutation;
        let id = Uuid::new_v4();
        let label = request.to_string();
        self.pending.lock().insert(
            id,
            MutationRecord { id, target_keys: targets.clone(), status: MutationStatus::Pending },
        );

        let mut guard = RollbackGuard { cache: &self.cache, pending: &self.pending, id, armed: false };
        if let Some(patch) = &optimistic {
            let affected = self.cache.apply_layer(id, &targets, patch);
            debug!(mutation = %id, request = %label, entries = affected.len(), "optimistic patch applied");
            guard.armed = !affected.is_empty();
        }

        match self.api.request(request).await {
            Ok(response) => {
                let invalidated = self.cache.commit_layer(id, &targets);
                guard.armed = false;
                guard.settle(MutationStatus::Committed);
                info!(mutation = %id, request = %label, invalidated, "mutation committed");
                Ok(response)
            }
            Err(error) => {
                let reverted = guard.rollback();
                warn!(mutation = %id, request = %label, error = %error, reverted, "mutation failed");
                Err(error)
            }
        }
    }
}

impl fmt::Debug for MutationExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationExecutor")
            .field("cache", &self.cache)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

/// Rolls back an applied layer and forgets the record unless disarmed
struct RollbackGuard<'a> {
    cache: &'a QueryCache,
    pending: &'a PendingMap,
    id: Uuid,
    armed: bool,
}

impl RollbackGuard<'_> {
    fn rollback(&mut self) -> usize {
        let reverted = if self.armed { self.cache.rollback_layer(self.id) } else { 0 };
        self.armed = false;
        self.settle(MutationStatus::RolledBack);
        reverted
    }

    fn settle(&self, status: MutationStatus) {
        if let Some(record) = self.pending.lock().remove(&self.id) {
            debug!(mutation = %record.id, %status, "mutation settled");
        }
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(mutation = %self.id, "mutation dropped before settling; rolling back");
            self.rollback();
        } else {
            self.pending.lock().remove(&self.id);
        }
    }
}
