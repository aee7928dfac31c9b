//! Access-token lifecycle and OIDC client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   TokenSource   │  current token, single-flight refresh, auto-refresh
//! └────────┬────────┘
//!          │ TokenRefresher
//!          ▼
//! ┌─────────────────┐
//! │   OidcClient    │  authorization URL (PKCE), code exchange,
//! └─────────────────┘  refresh grant, end-session URL
//! ```
//!
//! The API client only sees the [`AccessTokenProvider`] trait.
//!
//! # Module Organization
//!
//! - **[`types`]**: `Token`, `TokenSet`, provider responses, `OidcError`
//! - **[`traits`]**: `TokenRefresher`, `AccessTokenProvider`
//! - **[`token_source`]**: `TokenSource`
//! - **[`oidc`]** and **[`pkce`]** (platform tier): the identity-provider
//!   client

#[cfg(feature = "platform")]
pub mod oidc;
#[cfg(feature = "platform")]
pub mod pkce;
pub mod token_source;
pub mod traits;
pub mod types;

pub use afasa_domain::{AuthFailureReason, AuthenticationError};
#[cfg(feature = "platform")]
pub use oidc::OidcClient;
#[cfg(feature = "platform")]
pub use pkce::PkceChallenge;
pub use token_source::TokenSource;
pub use traits::{AccessTokenProvider, TokenRefresher};
pub use types::{OidcError, ProviderError, Token, TokenResponse, TokenSet};
