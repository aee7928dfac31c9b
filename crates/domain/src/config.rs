//! Console configuration
//!
//! Supplied once at process start (see `afasa_infra::config::loader`) and
//! never re-read at runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_NETWORK_RETRIES, DEFAULT_OIDC_SCOPES,
    DEFAULT_REFRESH_SKEW_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BACKOFF_MS,
};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub oidc: OidcSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Additional attempts after a network failure (idempotent requests only).
    #[serde(default = "default_network_retries")]
    pub network_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            network_retries: DEFAULT_NETWORK_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// OIDC client registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcSettings {
    /// Realm issuer, e.g. `http://localhost:8080/realms/afasa`.
    pub issuer_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: String,
    /// Refresh this many seconds before the access token expires.
    #[serde(default = "default_refresh_skew_secs")]
    pub refresh_skew_secs: u64,
}

impl OidcSettings {
    pub fn new(
        issuer_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            issuer_url: issuer_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            post_logout_redirect_uri: None,
            scopes: default_scopes(),
            refresh_skew_secs: DEFAULT_REFRESH_SKEW_SECS,
        }
    }

    pub const fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }
}

/// Cache time-to-live per resource class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Overrides keyed by resource class (`"tasks"`, `"audit"`, ...).
    #[serde(default)]
    pub resource_ttl_secs: BTreeMap<String, u64>,
}

impl CacheSettings {
    /// TTL for a resource class, falling back to the default.
    pub fn ttl_for(&self, class: &str) -> Duration {
        let secs = self.resource_ttl_secs.get(class).copied().unwrap_or(self.default_ttl_secs);
        Duration::from_secs(secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { default_ttl_secs: DEFAULT_CACHE_TTL_SECS, resource_ttl_secs: BTreeMap::new() }
    }
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_network_retries() -> u32 {
    DEFAULT_NETWORK_RETRIES
}

const fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_scopes() -> String {
    DEFAULT_OIDC_SCOPES.to_string()
}

const fn default_refresh_skew_secs() -> u64 {
    DEFAULT_REFRESH_SKEW_SECS
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}
