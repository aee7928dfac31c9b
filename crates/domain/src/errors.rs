//! Error types used throughout the application
//!
//! Three layers of failure are modelled here:
//! - [`AuthenticationError`]: the token source could not produce a token.
//! - [`ApiError`]: a backend call failed. Cloneable so a single fetch failure
//!   can be stored in the cache and handed to every coalesced waiter.
//! - [`ConsoleError`]: what workflow commands return to their callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_domain_status_conversions;

/// Why the token source could not supply a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureReason {
    /// The refresh call was rejected or could not be completed. Terminal
    /// until a new sign-in.
    RefreshFailed,
    /// No session exists (before the first sign-in, or after sign-out).
    NotSignedIn,
}

impl_domain_status_conversions!(AuthFailureReason {
    RefreshFailed => "refresh_failed",
    NotSignedIn => "not_signed_in",
});

/// Failure to obtain an access token
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("authentication required: {reason}")]
pub struct AuthenticationError {
    pub reason: AuthFailureReason,
}

impl AuthenticationError {
    pub const fn refresh_failed() -> Self {
        Self { reason: AuthFailureReason::RefreshFailed }
    }

    pub const fn not_signed_in() -> Self {
        Self { reason: AuthFailureReason::NotSignedIn }
    }
}

/// Classification of a network-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkFailure {
    Timeout,
    Connection,
    Other,
}

impl_domain_status_conversions!(NetworkFailure {
    Timeout => "timeout",
    Connection => "connection",
    Other => "other",
});

/// Coarse error kind, used for logging and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    Unauthenticated,
    Http,
    Network,
    InvalidResponse,
    InvalidRequest,
}

impl_domain_status_conversions!(ApiErrorKind {
    Unauthenticated => "unauthenticated",
    Http => "http",
    Network => "network",
    InvalidResponse => "invalid_response",
    InvalidRequest => "invalid_request",
});

/// Normalised backend failure
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ApiError {
    /// No usable token, or the backend rejected the token twice.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Non-2xx status other than 401.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Timeout, refused connection or another transport failure.
    #[error("Network error ({reason}): {message}")]
    Network { reason: NetworkFailure, message: String },

    /// A 2xx response whose body was not JSON.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request could not be built (bad URL, unserialisable body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http { status, body: body.into() }
    }

    pub fn network(reason: NetworkFailure, message: impl Into<String>) -> Self {
        Self::Network { reason, message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::network(NetworkFailure::Timeout, message)
    }

    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Unauthenticated => ApiErrorKind::Unauthenticated,
            Self::Http { .. } => ApiErrorKind::Http,
            Self::Network { .. } => ApiErrorKind::Network,
            Self::InvalidResponse(_) => ApiErrorKind::InvalidResponse,
            Self::InvalidRequest(_) => ApiErrorKind::InvalidRequest,
        }
    }

    /// Whether the failure is a transport problem worth another attempt.
    pub const fn is_retryable_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// HTTP status carried by the error, if any.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthenticated => Some(401),
            _ => None,
        }
    }
}

impl From<AuthenticationError> for ApiError {
    fn from(_: AuthenticationError) -> Self {
        Self::Unauthenticated
    }
}

/// Main error type for console commands
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ConsoleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(AuthenticationError),

    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConsoleError {
    /// The caller should send the operator through the sign-in entry point.
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Api(ApiError::Unauthenticated))
    }
}

impl From<ApiError> for ConsoleError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<AuthenticationError> for ConsoleError {
    fn from(err: AuthenticationError) -> Self {
        Self::Auth(err)
    }
}

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
