//! Modular common utilities shared across AFASA crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: plain data types
//! - `runtime`: clocks and the token lifecycle (`TokenSource`)
//! - `platform`: the OIDC client that talks to the identity provider
//! - `test-utils`: mocks and async helpers for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::OidcClient;
#[cfg(feature = "runtime")]
pub use auth::{AccessTokenProvider, Token, TokenRefresher, TokenSet, TokenSource};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
