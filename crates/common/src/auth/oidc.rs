//! OIDC client for the redirect-based sign-in flow
//!
//! Endpoints are derived from the realm issuer the way Keycloak lays them out:
//! - `{issuer}/protocol/openid-connect/auth`
//! - `{issuer}/protocol/openid-connect/token`
//! - `{issuer}/protocol/openid-connect/logout`
//!
//! The client builds the authorization URL (PKCE S256), exchanges the
//! returned code, refreshes tokens for [`TokenSource`](super::TokenSource)
//! and builds the end-session URL. Opening URLs and receiving the redirect is
//! the caller's job.

use std::sync::Arc;
use std::time::Duration;

use afasa_domain::OidcSettings;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::pkce::{validate_state, PkceChallenge};
use super::traits::TokenRefresher;
use super::types::{OidcError, ProviderError, TokenResponse, TokenSet};
use crate::time::{Clock, SystemClock};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OIDC public client (no client secret)
#[derive(Clone)]
pub struct OidcClient {
    settings: OidcSettings,
    issuer: String,
    http: Client,
    pending: Arc<Mutex<Option<PkceChallenge>>>,
    clock: Arc<dyn Clock>,
}

impl OidcClient {
    /// Create a client for the configured realm
    ///
    /// # Errors
    /// Returns `OidcError::Config` if the issuer is not an absolute http(s)
    /// URL or the HTTP client cannot be built.
    pub fn new(settings: OidcSettings) -> Result<Self, OidcError> {
        let parsed = url::Url::parse(&settings.issuer_url)
            .map_err(|e| OidcError::Config(format!("Invalid issuer URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OidcError::Config(format!(
                "Issuer URL must be http(s): {}",
                settings.issuer_url
            )));
        }

        let http = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| OidcError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            issuer: settings.issuer_url.trim_end_matches('/').to_string(),
            settings,
            http,
            pending: Arc::new(Mutex::new(None)),
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/protocol/openid-connect/{name}", self.issuer)
    }

    pub fn token_endpoint(&self) -> String {
        self.endpoint("token")
    }

    #[must_use]
    pub const fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Start a sign-in: returns `(authorization_url, state)`
    ///
    /// The PKCE verifier is kept until [`exchange_code`](Self::exchange_code).
    /// Starting again replaces any earlier attempt.
    pub fn authorization_url(&self) -> (String, String) {
        let challenge = PkceChallenge::generate();
        let state = challenge.state.clone();

        let params = [
            ("response_type", "code"),
            ("client_id", self.settings.client_id.as_str()),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("scope", self.settings.scopes.as_str()),
            ("state", state.as_str()),
            ("code_challenge", challenge.code_challenge.as_str()),
            ("code_challenge_method", challenge.challenge_method()),
        ];
        let url = format!("{}?{}", self.endpoint("auth"), encode_query(&params));

        *self.pending.lock() = Some(challenge);
        debug!("Authorization URL generated");
        (url, state)
    }

    /// Complete a sign-in with the code and state from the redirect
    ///
    /// # Errors
    /// - `NoPendingSignIn` if [`authorization_url`](Self::authorization_url)
    ///   was not called first
    /// - `StateMismatch` if the state does not match (CSRF)
    /// - `Request`/`Provider`/`Parse` if the token exchange fails
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenSet, OidcError> {
        let challenge = self.pending.lock().take().ok_or(OidcError::NoPendingSignIn)?;

        if !validate_state(&challenge.state, state) {
            warn!("Sign-in callback state mismatch");
            return Err(OidcError::StateMismatch {
                expected: challenge.state,
                received: state.to_string(),
            });
        }

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.settings.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("code_verifier", challenge.code_verifier.as_str()),
        ];
        let tokens = self.post_token_form(&params).await?;
        info!("Authorization code exchanged");
        Ok(tokens)
    }

    /// Refresh-token grant
    ///
    /// # Errors
    /// Returns `NoRefreshToken` for an empty token, otherwise the token
    /// endpoint failure.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenSet, OidcError> {
        if refresh_token.is_empty() {
            return Err(OidcError::NoRefreshToken);
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.settings.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        let mut tokens = self.post_token_form(&params).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        Ok(tokens)
    }

    /// RP-initiated logout URL
    pub fn end_session_url(&self, id_token_hint: Option<&str>) -> String {
        let mut params = vec![("client_id", self.settings.client_id.as_str())];
        if let Some(uri) = self.settings.post_logout_redirect_uri.as_deref() {
            params.push(("post_logout_redirect_uri", uri));
        }
        if let Some(hint) = id_token_hint {
            params.push(("id_token_hint", hint));
        }
        format!("{}?{}", self.endpoint("logout"), encode_query(&params))
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> Result<TokenSet, OidcError> {
        let response = self
            .http
            .post(self.token_endpoint())
            .form(params)
            .send()
            .await
            .map_err(|e| OidcError::Request(e.to_string()))?;
        let issued_at = self.clock.utc_now();

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<ProviderError>(&body).unwrap_or(ProviderError {
                error: format!("http_{}", status.as_u16()),
                error_description: (!body.is_empty()).then_some(body),
            });
            return Err(OidcError::Provider(error));
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OidcError::Parse(e.to_string()))?;
        Ok(TokenSet::from_response(token_response, issued_at))
    }
}

fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl TokenRefresher for OidcClient {
    async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, OidcError> {
        let refresh_token = current.refresh_token.as_deref().ok_or(OidcError::NoRefreshToken)?;
        let mut next = self.refresh_tokens(refresh_token).await?;
        if next.id_token.is_none() {
            next.id_token.clone_from(&current.id_token);
        }
        Ok(next)
    }
}
