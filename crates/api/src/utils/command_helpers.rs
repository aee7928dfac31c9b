//! Command execution helpers
//!
//! Provides utilities to reduce boilerplate when implementing commands with
//! timing and logging, and to turn cached snapshots into command results.

use std::future::Future;
use std::time::Instant;

use afasa_core::QuerySnapshot;
use afasa_domain::{ApiError, ConsoleError, QueryStatus, Result as DomainResult};
use tracing::debug;

use crate::utils::logging::{error_label, log_command_execution};

/// Execute a command with automatic timing and logging
///
/// # Example
///
/// ```rust,ignore
/// pub async fn my_command(ctx: &ConsoleContext) -> Result<QuerySnapshot> {
///     execute_command("my_module::my_command", || async {
///         read(ctx, &queries::devices()).await
///     })
///     .await
/// }
/// ```
pub async fn execute_command<F, Fut, T>(command_name: &str, command_fn: F) -> DomainResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = DomainResult<T>>,
{
    let start = Instant::now();

    let result = command_fn().await;

    let elapsed = start.elapsed();
    if let Err(err) = &result {
        debug!(command = command_name, error_type = error_label(err), error = %err, "command failed");
    }
    log_command_execution(command_name, elapsed, result.is_ok());

    result
}

/// Return `snapshot` unless it failed because the session is gone
///
/// A read that failed for any other reason is still returned so the caller
/// can show the last known value next to the error.
///
/// # Errors
/// `ConsoleError::Api(Unauthenticated)` when the read was rejected for lack
/// of a valid session.
pub fn require_session(snapshot: QuerySnapshot) -> DomainResult<QuerySnapshot> {
    if snapshot.status == QueryStatus::Error && snapshot.error == Some(ApiError::Unauthenticated) {
        return Err(ConsoleError::Api(ApiError::Unauthenticated));
    }
    Ok(snapshot)
}

/// Reject a blank identifier before it reaches the backend
///
/// # Errors
/// `ConsoleError::InvalidInput` naming `field`.
pub fn require_id<'a>(field: &str, value: &'a str) -> DomainResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConsoleError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed)
}
