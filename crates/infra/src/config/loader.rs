//! Configuration loader
//!
//! Loads console configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Whatever the source, the result is validated before it is returned.
//!
//! ## Environment Variables
//! Required:
//! - `AFASA_API_BASE_URL`: backend base URL
//! - `AFASA_OIDC_ISSUER_URL`: realm issuer URL
//! - `AFASA_OIDC_CLIENT_ID`: public client identifier
//! - `AFASA_OIDC_REDIRECT_URI`: sign-in callback URI
//!
//! Optional:
//! - `AFASA_API_TIMEOUT_SECS`: per-request timeout (default 10)
//! - `AFASA_API_NETWORK_RETRIES`: retries for idempotent calls (default 2)
//! - `AFASA_OIDC_POST_LOGOUT_REDIRECT_URI`: where sign-out returns to
//! - `AFASA_OIDC_REFRESH_SKEW_SECS`: refresh lead time (default 60)
//! - `AFASA_CACHE_TTL_SECS`: default cache TTL (default 30)
//!
//! ## File Locations
//! For each of `console.toml`, `console.json`, `config.toml` and
//! `config.json` the loader tries the current directory, its parent and
//! grandparent, then the executable's directory.

use std::path::{Path, PathBuf};

use afasa_domain::constants::{
    CONFIG_FILE_NAMES, ENV_API_BASE_URL, ENV_API_NETWORK_RETRIES, ENV_API_TIMEOUT_SECS,
    ENV_CACHE_TTL_SECS, ENV_OIDC_CLIENT_ID, ENV_OIDC_ISSUER_URL,
    ENV_OIDC_POST_LOGOUT_REDIRECT_URI, ENV_OIDC_REDIRECT_URI, ENV_OIDC_REFRESH_SKEW_SECS,
};
use afasa_domain::{ApiConfig, CacheSettings, Config, ConsoleError, OidcSettings, Result};
use url::Url;

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If any required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ConsoleError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A URL is malformed or the client id is empty
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from the process environment
///
/// # Errors
/// Returns `ConsoleError::Config` if a required variable is missing or a
/// value is invalid.
pub fn load_from_env() -> Result<Config> {
    load_from_env_with(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup
///
/// # Errors
/// As [`load_from_env`].
pub fn load_from_env_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConsoleError::Config(format!("Missing required environment variable: {key}")))
    };

    let mut api = ApiConfig::new(required(ENV_API_BASE_URL)?);
    if let Some(secs) = parse_optional::<u64, _>(&lookup, ENV_API_TIMEOUT_SECS)? {
        api.request_timeout_secs = secs;
    }
    if let Some(retries) = parse_optional::<u32, _>(&lookup, ENV_API_NETWORK_RETRIES)? {
        api.network_retries = retries;
    }

    let mut oidc = OidcSettings::new(
        required(ENV_OIDC_ISSUER_URL)?,
        required(ENV_OIDC_CLIENT_ID)?,
        required(ENV_OIDC_REDIRECT_URI)?,
    );
    oidc.post_logout_redirect_uri = lookup(ENV_OIDC_POST_LOGOUT_REDIRECT_URI);
    if let Some(skew) = parse_optional::<u64, _>(&lookup, ENV_OIDC_REFRESH_SKEW_SECS)? {
        oidc.refresh_skew_secs = skew;
    }

    let mut cache = CacheSettings::default();
    if let Some(ttl) = parse_optional::<u64, _>(&lookup, ENV_CACHE_TTL_SECS)? {
        cache.default_ttl_secs = ttl;
    }

    let config = Config { api, oidc, cache };
    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ConsoleError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or a required field is missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConsoleError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConsoleError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ConsoleError::Config(format!("Failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConsoleError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConsoleError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ConsoleError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Check a loaded configuration
///
/// # Errors
/// Returns `ConsoleError::Config` naming the first offending field.
pub fn validate(config: &Config) -> Result<()> {
    require_http_url("api.base_url", &config.api.base_url)?;
    require_http_url("oidc.issuer_url", &config.oidc.issuer_url)?;
    require_http_url("oidc.redirect_uri", &config.oidc.redirect_uri)?;
    if let Some(uri) = &config.oidc.post_logout_redirect_uri {
        require_http_url("oidc.post_logout_redirect_uri", uri)?;
    }
    if config.oidc.client_id.trim().is_empty() {
        return Err(ConsoleError::Config("oidc.client_id must not be empty".to_string()));
    }
    if config.api.request_timeout_secs == 0 {
        return Err(ConsoleError::Config("api.request_timeout_secs must be positive".to_string()));
    }
    Ok(())
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn require_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| ConsoleError::Config(format!("{field} is not a valid URL ({value}): {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConsoleError::Config(format!("{field} must use http or https, got {other}"))),
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConsoleError::Config(format!("Invalid value for {key} ({raw}): {e}")))
        })
        .transpose()
}
