//! Traits at the token-lifecycle seams
//!
//! These traits enable dependency injection and testing by abstracting the
//! identity provider (for refresh) and the token source (for API calls).

use afasa_domain::AuthenticationError;
use async_trait::async_trait;

use super::types::{OidcError, Token, TokenSet};

/// Exchanges a token set for a fresh one
///
/// Implemented by [`OidcClient`](super::OidcClient) and by
/// `testing::MockTokenRefresher`.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Refresh using the refresh token in `current`.
    ///
    /// # Errors
    /// Returns error if no refresh token is available or the provider rejects
    /// the refresh.
    async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, OidcError>;
}

/// Supplies bearer tokens to the API client
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Current access token, refreshing first if it is near expiry.
    ///
    /// # Errors
    /// Returns `AuthenticationError` when not signed in or after a failed
    /// refresh.
    async fn access_token(&self) -> Result<Token, AuthenticationError>;

    /// Report that the backend rejected `rejected_value`. The next
    /// `access_token` call refreshes if that token is still current.
    fn invalidate(&self, rejected_value: &str);
}
