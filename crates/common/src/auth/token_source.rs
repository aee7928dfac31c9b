//! Access-token lifecycle with single-flight refresh
//!
//! [`TokenSource`] owns the current [`TokenSet`] and hands out access tokens:
//! - A token outside the skew window is returned without suspending.
//! - A token inside the window (or one the backend rejected) is refreshed.
//!   Concurrent callers share one in-progress refresh.
//! - A failed refresh is terminal: every waiter and every later caller gets
//!   `AuthenticationError { reason: refresh_failed }` until the next
//!   [`sign_in`](TokenSource::sign_in).
//!
//! Readers only ever observe a complete token set; the swap happens under a
//! single lock.

use std::sync::Arc;
use std::time::Duration;

use afasa_domain::AuthenticationError;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::traits::{AccessTokenProvider, TokenRefresher};
use super::types::{Token, TokenSet};
use crate::time::{Clock, SystemClock};

/// Lower bound between two auto-refresh checks after the first one.
const MIN_AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

type RefreshFuture = Shared<BoxFuture<'static, Result<Token, AuthenticationError>>>;

enum Session {
    SignedOut,
    /// `forced` is set when the backend rejected the current access token.
    Active {
        tokens: TokenSet,
        forced: bool,
    },
    Failed,
}

impl Session {
    fn token_or_error(&self) -> Result<Token, AuthenticationError> {
        match self {
            Self::Active { tokens, .. } => Ok(tokens.access.clone()),
            Self::SignedOut => Err(AuthenticationError::not_signed_in()),
            Self::Failed => Err(AuthenticationError::refresh_failed()),
        }
    }
}

struct State {
    session: Session,
    /// Bumped by sign-in and sign-out so a refresh started for an older
    /// session cannot overwrite the current one.
    generation: u64,
    refresh: Option<RefreshFuture>,
}

/// Owner of the access token
pub struct TokenSource {
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
    skew: chrono::Duration,
    state: Arc<Mutex<State>>,
}

impl TokenSource {
    /// Create a signed-out token source
    ///
    /// # Arguments
    /// * `refresher` - Identity provider client used for refresh
    /// * `skew` - Refresh this long before the access token expires
    pub fn new(refresher: Arc<dyn TokenRefresher>, skew: Duration) -> Self {
        Self {
            refresher,
            clock: Arc::new(SystemClock),
            skew: chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero()),
            state: Arc::new(Mutex::new(State {
                session: Session::SignedOut,
                generation: 0,
                refresh: None,
            })),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install tokens from a completed sign-in. Clears any terminal failure.
    pub fn sign_in(&self, tokens: TokenSet) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.refresh = None;
        info!(expires_at = %tokens.access.expires_at, "Session started");
        state.session = Session::Active { tokens, forced: false };
    }

    /// Drop the session, returning the tokens that were active (the ID token
    /// is needed for the end-session redirect). A refresh in flight is
    /// discarded when it lands.
    pub fn sign_out(&self) -> Option<TokenSet> {
        let mut state = self.state.lock();
        state.generation += 1;
        state.refresh = None;
        let previous = std::mem::replace(&mut state.session, Session::SignedOut);
        info!("Session ended");
        match previous {
            Session::Active { tokens, .. } => Some(tokens),
            Session::SignedOut | Session::Failed => None,
        }
    }

    /// Current access token, refreshing first when needed
    ///
    /// # Errors
    /// - `not_signed_in` before the first sign-in or after sign-out
    /// - `refresh_failed` once a refresh has failed
    pub async fn current_token(&self) -> Result<Token, AuthenticationError> {
        let pending = {
            let mut state = self.state.lock();
            let current = match &state.session {
                Session::SignedOut => return Err(AuthenticationError::not_signed_in()),
                Session::Failed => return Err(AuthenticationError::refresh_failed()),
                Session::Active { tokens, forced } => {
                    if !*forced && !tokens.access.expires_within(self.clock.utc_now(), self.skew)
                    {
                        return Ok(tokens.access.clone());
                    }
                    tokens.clone()
                }
            };
            self.join_or_start_refresh(&mut state, current)
        };
        pending.await
    }

    fn join_or_start_refresh(&self, state: &mut State, current: TokenSet) -> RefreshFuture {
        if let Some(in_flight) = &state.refresh {
            debug!("Joining in-flight token refresh");
            return in_flight.clone();
        }

        let generation = state.generation;
        let refresher = Arc::clone(&self.refresher);
        let shared_state = Arc::clone(&self.state);
        info!("Refreshing access token");

        let refresh = async move {
            let outcome = refresher.refresh(&current).await;

            let mut state = shared_state.lock();
            if state.generation != generation {
                debug!("Session changed during refresh; discarding result");
                return state.session.token_or_error();
            }
            state.refresh = None;

            match outcome {
                Ok(tokens) => {
                    let token = tokens.access.clone();
                    info!(expires_at = %token.expires_at, "Access token refreshed");
                    state.session = Session::Active { tokens, forced: false };
                    Ok(token)
                }
                Err(err) => {
                    warn!(error = %err, "Token refresh failed; sign-in required");
                    state.session = Session::Failed;
                    Err(AuthenticationError::refresh_failed())
                }
            }
        }
        .boxed()
        .shared();

        state.refresh = Some(refresh.clone());
        refresh
    }

    /// Force the next [`current_token`](Self::current_token) to refresh, but
    /// only if `rejected_value` is still the current access token. Requests
    /// that raced a refresh and were rejected with the old token do not
    /// trigger a second refresh.
    pub fn invalidate(&self, rejected_value: &str) {
        let mut state = self.state.lock();
        if let Session::Active { tokens, forced } = &mut state.session {
            if !*forced && tokens.access.value == rejected_value {
                debug!("Access token rejected by backend; next use refreshes");
                *forced = true;
            }
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state.lock().session, Session::Active { .. })
    }

    /// Snapshot of the active token set
    #[must_use]
    pub fn tokens(&self) -> Option<TokenSet> {
        match &self.state.lock().session {
            Session::Active { tokens, .. } => Some(tokens.clone()),
            Session::SignedOut | Session::Failed => None,
        }
    }

    /// Time until the token enters the refresh window, `None` without an
    /// active session.
    #[must_use]
    pub fn refresh_delay(&self) -> Option<Duration> {
        let state = self.state.lock();
        match &state.session {
            Session::Active { forced: true, .. } => Some(Duration::ZERO),
            Session::Active { tokens, .. } => {
                let until_window = tokens.access.remaining(self.clock.utc_now()) - self.skew;
                Some(until_window.to_std().unwrap_or(Duration::ZERO))
            }
            Session::SignedOut | Session::Failed => None,
        }
    }

    fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Silent renewal loop
    ///
    /// Sleeps until the token enters the refresh window and refreshes through
    /// the same single-flight path as [`current_token`](Self::current_token).
    /// Returns after a failed refresh, or once the session it started with
    /// has ended.
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use afasa_common::auth::TokenSource;
    /// # fn example(tokens: Arc<TokenSource>) {
    /// tokio::spawn(tokens.start_auto_refresh());
    /// # }
    /// ```
    pub async fn start_auto_refresh(self: Arc<Self>) {
        let generation = self.generation();
        let mut floor = Duration::ZERO;
        info!("Starting token auto-refresh background task");

        loop {
            let Some(delay) = self.refresh_delay() else {
                debug!("No active session; auto-refresh stopped");
                return;
            };
            let delay = delay.max(floor);
            if !delay.is_zero() {
                debug!(seconds = delay.as_secs(), "Auto-refresh sleeping until refresh window");
                tokio::time::sleep(delay).await;
            }

            if self.generation() != generation {
                debug!("Session changed; auto-refresh stopped");
                return;
            }

            if let Err(err) = self.current_token().await {
                warn!(error = %err, "Auto-refresh stopped");
                return;
            }
            floor = MIN_AUTO_REFRESH_INTERVAL;
        }
    }
}

#[async_trait]
impl AccessTokenProvider for TokenSource {
    async fn access_token(&self) -> Result<Token, AuthenticationError> {
        self.current_token().await
    }

    fn invalidate(&self, rejected_value: &str) {
        Self::invalidate(self, rejected_value);
    }
}
