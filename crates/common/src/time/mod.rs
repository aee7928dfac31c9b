//! Time utilities and abstractions
//!
//! - **[`clock`]**: the [`Clock`] trait with a real and a mock implementation.
//!   Token expiry and cache staleness are both measured through a `Clock` so
//!   tests can move time forward without sleeping.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use afasa_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(31));
//! assert_eq!(clock.now().duration_since(start), Duration::from_secs(31));
//! ```

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
