//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling and timeout helpers
//! - **[`fixtures`]**: token fixtures relative to a clock
//! - **[`mocks`]**: `MockTokenRefresher`
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for downstream crates.

pub mod async_utils;
pub mod fixtures;
pub mod mocks;

pub use async_utils::{poll_until, timeout_ok};
pub use fixtures::token_set;
pub use mocks::MockTokenRefresher;

pub use crate::time::{Clock, MockClock, SystemClock};
