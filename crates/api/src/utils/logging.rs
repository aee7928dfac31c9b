use std::sync::OnceLock;
use std::time::Duration;

use afasa_domain::{ApiError, ConsoleError};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INITIALIZED: OnceLock<bool> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. With `json` the fmt layer
/// emits one JSON object per event. Safe to call more than once; returns
/// `true` if this process's subscriber was installed here.
pub fn init_tracing(default_filter: &str, json: bool) -> bool {
    *TRACING_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
        let registry = tracing_subscriber::registry().with(filter);

        let installed = if json {
            registry.with(fmt::layer().json().with_target(true)).try_init().is_ok()
        } else {
            registry.with(fmt::layer().with_target(true)).try_init().is_ok()
        };

        if installed {
            info!(json, "tracing initialised");
        }
        installed
    })
}

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"tasks::complete_task"`).
/// * `elapsed` - Duration the command execution took.
/// * `success` - Whether the command completed successfully.
///
/// Callers must avoid forwarding sensitive values in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, success: bool) {
    let duration_ms = elapsed.as_millis() as u64;

    if success {
        info!(command, duration_ms, "command_execution_success");
    } else {
        warn!(command, duration_ms, "command_execution_failure");
    }
}

/// Convert a `ConsoleError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &ConsoleError) -> &'static str {
    match error {
        ConsoleError::Config(_) => "config",
        ConsoleError::Auth(_) | ConsoleError::Api(ApiError::Unauthenticated) => "unauthenticated",
        ConsoleError::Api(ApiError::Http { .. }) => "http",
        ConsoleError::Api(ApiError::Network { .. }) => "network",
        ConsoleError::Api(ApiError::InvalidResponse(_)) => "invalid_response",
        ConsoleError::Api(ApiError::InvalidRequest(_)) => "invalid_request",
        ConsoleError::InvalidInput(_) => "invalid_input",
        ConsoleError::Internal(_) => "internal",
    }
}
