//! Console context - dependency injection container
//!
//! Wires configuration → OIDC client → token source → API client → query
//! cache → mutation executor, and owns the session entry points.

use std::sync::Arc;
use std::time::Duration;

use afasa_common::auth::OidcClient;
use afasa_common::{TokenRefresher, TokenSet, TokenSource};
use afasa_core::{ApiPort, MutationExecutor, QueryCache, ResourceService};
use afasa_domain::{Config, ConsoleError, Result};
use afasa_infra::{config, ApiClient};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Console context - holds all services and dependencies
pub struct ConsoleContext {
    pub config: Config,
    pub oidc: Arc<OidcClient>,
    pub tokens: Arc<TokenSource>,
    pub api: Arc<ApiClient>,
    pub cache: QueryCache,
    pub resources: ResourceService,
    pub mutations: MutationExecutor,

    auto_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleContext {
    /// Build the context from `.env`, the environment and config files
    ///
    /// # Errors
    /// Returns `ConsoleError::Config` if no valid configuration is found.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "Loaded .env"),
            Err(e) => warn!(error = %e, "Could not load .env file"),
        }

        Self::new(config::load()?)
    }

    /// Build the context from an already loaded configuration
    ///
    /// Refreshes go to the configured identity provider.
    ///
    /// # Errors
    /// Returns `ConsoleError::Config` if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let oidc = OidcClient::new(config.oidc.clone())
            .map_err(|e| ConsoleError::Config(format!("OIDC client: {e}")))?;
        let oidc = Arc::new(oidc);
        let refresher: Arc<dyn TokenRefresher> = oidc.clone();

        Self::assemble(config, oidc, refresher)
    }

    /// Build the context with a custom token refresher
    ///
    /// Used by tests and by embedders that obtain tokens elsewhere.
    ///
    /// # Errors
    /// Returns `ConsoleError::Config` if the configuration is invalid.
    pub fn with_refresher(config: Config, refresher: Arc<dyn TokenRefresher>) -> Result<Self> {
        let oidc = OidcClient::new(config.oidc.clone())
            .map_err(|e| ConsoleError::Config(format!("OIDC client: {e}")))?;

        Self::assemble(config, Arc::new(oidc), refresher)
    }

    fn assemble(config: Config, oidc: Arc<OidcClient>, refresher: Arc<dyn TokenRefresher>) -> Result<Self> {
        config::validate(&config)?;

        let tokens = Arc::new(TokenSource::new(refresher, config.oidc.refresh_skew()));
        let api = Arc::new(ApiClient::new(&config.api, tokens.clone())?);
        let port: Arc<dyn ApiPort> = api.clone();

        let cache = QueryCache::new(Duration::from_secs(config.cache.default_ttl_secs));
        let resources = ResourceService::new(Arc::clone(&port), cache.clone(), config.cache.clone());
        let mutations = MutationExecutor::new(port, cache.clone());

        info!(base_url = %config.api.base_url, issuer = %config.oidc.issuer_url, "Console context initialised");

        Ok(Self {
            config,
            oidc,
            tokens,
            api,
            cache,
            resources,
            mutations,
            auto_refresh: Mutex::new(None),
        })
    }

    /// Start a sign-in: returns `(authorization_url, state)`
    pub fn sign_in_url(&self) -> (String, String) {
        self.oidc.authorization_url()
    }

    /// Complete a sign-in with the code and state from the redirect
    ///
    /// # Errors
    /// Returns `ConsoleError::Config` for a state mismatch or when the code
    /// exchange is rejected.
    pub async fn complete_sign_in(&self, code: &str, state: &str) -> Result<()> {
        let tokens = self
            .oidc
            .exchange_code(code, state)
            .await
            .map_err(|e| ConsoleError::Config(format!("sign-in failed: {e}")))?;

        self.install_session(tokens);
        Ok(())
    }

    /// Install a token set and start silent renewal
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install_session(&self, tokens: TokenSet) {
        self.tokens.sign_in(tokens);

        let handle = tokio::spawn(Arc::clone(&self.tokens).start_auto_refresh());
        if let Some(previous) = self.auto_refresh.lock().replace(handle) {
            previous.abort();
        }
    }

    /// End the session
    ///
    /// Stops silent renewal, drops the tokens and clears every cached query.
    /// Returns the identity provider's end-session URL.
    pub fn sign_out(&self) -> String {
        if let Some(handle) = self.auto_refresh.lock().take() {
            handle.abort();
        }

        let previous = self.tokens.sign_out();
        let cleared = self.cache.clear();
        info!(cleared, "Signed out");

        let id_token = previous.and_then(|tokens| tokens.id_token);
        self.oidc.end_session_url(id_token.as_deref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }
}

impl Drop for ConsoleContext {
    fn drop(&mut self) {
        if let Some(handle) = self.auto_refresh.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ConsoleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleContext")
            .field("api", &self.api)
            .field("authenticated", &self.is_authenticated())
            .field("cached_queries", &self.cache.len())
            .finish_non_exhaustive()
    }
}
