//! Shared test helpers for `afasa-core` integration tests.
//!
//! `StubApi` answers requests from a per-route script so scenarios can focus
//! on cache behaviour instead of HTTP plumbing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use afasa_core::ApiPort;
use afasa_domain::{ApiError, ApiRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

/// In-memory backend keyed by `"METHOD /path?query"`
#[derive(Default)]
pub struct StubApi {
    queued: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
    sticky: Mutex<HashMap<String, Result<Value, ApiError>>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call to `route` with `result`
    pub fn respond(&self, route: &str, result: Result<Value, ApiError>) {
        self.sticky.lock().insert(route.to_string(), result);
    }

    /// Answer the next call to `route` with `result`, ahead of the sticky
    /// response
    pub fn respond_once(&self, route: &str, result: Result<Value, ApiError>) {
        self.queued.lock().entry(route.to_string()).or_default().push_back(result);
    }

    pub fn delay(&self, route: &str, delay: Duration) {
        self.delays.lock().insert(route.to_string(), delay);
    }

    pub fn call_count(&self, route: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == route).count()
    }
}

#[async_trait]
impl ApiPort for StubApi {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let route = request.to_string();
        self.calls.lock().push(route.clone());

        let delay = self.delays.lock().get(&route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queued.lock().get_mut(&route).and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.sticky.lock().get(&route).cloned())
            .unwrap_or_else(|| Err(ApiError::http(404, format!("no stub for {route}"))))
    }
}
