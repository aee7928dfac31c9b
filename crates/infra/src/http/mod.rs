//! HTTP transport with per-attempt timeout and bounded retry

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
