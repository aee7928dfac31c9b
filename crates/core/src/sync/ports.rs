//! Port interfaces for backend synchronisation

use std::sync::Arc;

use afasa_domain::{ApiError, ApiRequest};
use async_trait::async_trait;
use serde_json::Value;

/// Authenticated access to the backend
///
/// Implementations attach credentials, retry what is safe to retry and
/// normalise every failure into an [`ApiError`].
#[async_trait]
pub trait ApiPort: Send + Sync {
    /// Issue a request and return the decoded JSON body
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[async_trait]
impl<T: ApiPort + ?Sized> ApiPort for Arc<T> {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        (**self).request(request).await
    }
}
