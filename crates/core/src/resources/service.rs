//! Cached reads of catalog resources

use std::sync::Arc;
use std::time::Duration;

use afasa_domain::{ApiRequest, CacheSettings};
use tracing::debug;

use super::queries::QueryDef;
use crate::sync::{fetcher_fn, ApiPort, Fetcher, QueryCache, QuerySnapshot, Subscription};

/// Read access to backend resources through the query cache
///
/// TTLs come from [`CacheSettings`] by resource class.
#[derive(Clone)]
pub struct ResourceService {
    api: Arc<dyn ApiPort>,
    cache: QueryCache,
    settings: CacheSettings,
}

impl ResourceService {
    pub fn new(api: Arc<dyn ApiPort>, cache: QueryCache, settings: CacheSettings) -> Self {
        Self { api, cache, settings }
    }

    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn ttl_for(&self, query: &QueryDef) -> Duration {
        self.settings.ttl_for(query.resource_class())
    }

    /// Fetcher that issues `query`'s request through the API port
    pub fn fetcher(&self, query: &QueryDef) -> Fetcher {
        request_fetcher(Arc::clone(&self.api), query.request.clone())
    }

    /// Cached read; fetches when the entry is missing, stale or failed
    pub async fn read(&self, query: &QueryDef) -> QuerySnapshot {
        let ttl = self.ttl_for(query);
        debug!(key = %query.key, ttl_secs = ttl.as_secs(), "reading resource");
        self.cache.get(&query.key, self.fetcher(query), ttl).await
    }

    /// Re-fetch `query` even if it is fresh
    pub async fn refresh(&self, query: &QueryDef) -> QuerySnapshot {
        match self.cache.refresh(&query.key).await {
            Some(snapshot) => snapshot,
            None => self.read(query).await,
        }
    }

    pub fn subscribe<F>(&self, query: &QueryDef, listener: F) -> Subscription
    where
        F: Fn(&QuerySnapshot) + Send + Sync + 'static,
    {
        self.cache.subscribe(&query.key, listener)
    }
}

fn request_fetcher(api: Arc<dyn ApiPort>, request: ApiRequest) -> Fetcher {
    fetcher_fn(move || {
        let api = Arc::clone(&api);
        let request = request.clone();
        async move { api.request(request).await }
    })
}
