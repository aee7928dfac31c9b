//! Backend API client
//!
//! [`ApiClient`] is the production implementation of
//! [`afasa_core::ApiPort`]: bearer authentication through an
//! [`AccessTokenProvider`](afasa_common::AccessTokenProvider), one
//! refresh-and-replay on 401, and error normalisation into
//! [`ApiError`](afasa_domain::ApiError).

pub mod client;

pub use client::{ApiClient, ApiClientBuilder, CONSOLE_USER_AGENT};
