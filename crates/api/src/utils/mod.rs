//! Shared helpers for commands

pub mod command_helpers;
pub mod logging;

pub use command_helpers::{execute_command, require_id, require_session};
pub use logging::{error_label, init_tracing, log_command_execution};
