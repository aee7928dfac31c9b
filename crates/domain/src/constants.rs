//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// API client defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NETWORK_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 200;
pub const MAX_RETRY_BACKOFF_MS: u64 = 5_000;

// Token lifecycle
pub const DEFAULT_REFRESH_SKEW_SECS: u64 = 60;
pub const DEFAULT_OIDC_SCOPES: &str = "openid profile email";

// Query cache
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

// Resource classes (first segment of a query key, used for TTL lookup)
pub const RESOURCE_TASKS: &str = "tasks";
pub const RESOURCE_PROPOSALS: &str = "proposals";
pub const RESOURCE_SNAPSHOTS: &str = "snapshots";
pub const RESOURCE_DEVICES: &str = "devices";
pub const RESOURCE_SETTINGS: &str = "settings";
pub const RESOURCE_REPORTS: &str = "reports";
pub const RESOURCE_AUDIT: &str = "audit";
pub const RESOURCE_ME: &str = "me";

// Environment variables read by the configuration loader
pub const ENV_API_BASE_URL: &str = "AFASA_API_BASE_URL";
pub const ENV_API_TIMEOUT_SECS: &str = "AFASA_API_TIMEOUT_SECS";
pub const ENV_API_NETWORK_RETRIES: &str = "AFASA_API_NETWORK_RETRIES";
pub const ENV_OIDC_ISSUER_URL: &str = "AFASA_OIDC_ISSUER_URL";
pub const ENV_OIDC_CLIENT_ID: &str = "AFASA_OIDC_CLIENT_ID";
pub const ENV_OIDC_REDIRECT_URI: &str = "AFASA_OIDC_REDIRECT_URI";
pub const ENV_OIDC_POST_LOGOUT_REDIRECT_URI: &str = "AFASA_OIDC_POST_LOGOUT_REDIRECT_URI";
pub const ENV_OIDC_REFRESH_SKEW_SECS: &str = "AFASA_OIDC_REFRESH_SKEW_SECS";
pub const ENV_CACHE_TTL_SECS: &str = "AFASA_CACHE_TTL_SECS";

// Config file names probed by the loader, in order
pub const CONFIG_FILE_NAMES: [&str; 4] = ["console.toml", "console.json", "config.toml", "config.json"];
