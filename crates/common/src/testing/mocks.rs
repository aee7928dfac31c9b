//! Mock implementations of common traits

// Allow missing error/panic docs for test mocks - they are designed to be simple
// and errors are clearly indicated by their return types
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::auth::{OidcError, ProviderError, Token, TokenRefresher, TokenSet};
use crate::time::{Clock, SystemClock};

/// Counting token refresher
///
/// The n-th refresh returns access token `"refreshed-n"` and refresh token
/// `"refresh-n"`, expiring `lifetime` after the clock's current time.
///
/// # Examples
///
/// ```
/// use afasa_common::testing::MockTokenRefresher;
///
/// let refresher = MockTokenRefresher::new();
/// refresher.set_should_fail(true);
/// assert_eq!(refresher.calls(), 0);
/// ```
pub struct MockTokenRefresher {
    calls: AtomicUsize,
    should_fail: AtomicBool,
    delay: Mutex<Duration>,
    lifetime: Mutex<chrono::Duration>,
    clock: Arc<dyn Clock>,
}

impl MockTokenRefresher {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            should_fail: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            lifetime: Mutex::new(chrono::Duration::seconds(3600)),
            clock,
        }
    }

    /// Make every refresh fail with `invalid_grant`.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Simulated identity-provider latency.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn set_lifetime_secs(&self, secs: i64) {
        *self.lifetime.lock() = chrono::Duration::seconds(secs);
    }

    /// Number of refresh calls so far (including failed ones).
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTokenRefresher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenRefresher for MockTokenRefresher {
    async fn refresh(&self, current: &TokenSet) -> Result<TokenSet, OidcError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail.load(Ordering::SeqCst) {
            return Err(OidcError::Provider(ProviderError {
                error: "invalid_grant".to_string(),
                error_description: Some("Token is not active".to_string()),
            }));
        }
        if current.refresh_token.is_none() {
            return Err(OidcError::NoRefreshToken);
        }

        let expires_at = self.clock.utc_now() + *self.lifetime.lock();
        Ok(TokenSet {
            access: Token::new(format!("refreshed-{n}"), expires_at),
            refresh_token: Some(format!("refresh-{n}")),
            id_token: current.id_token.clone(),
            scope: current.scope.clone(),
        })
    }
}
