//! Token fixtures

use chrono::Duration;

use crate::auth::{Token, TokenSet};
use crate::time::Clock;

/// A token set whose access token expires `expires_in_secs` after the
/// clock's current time (negative for an already expired token). Carries
/// refresh token `"refresh-0"`.
pub fn token_set(value: &str, expires_in_secs: i64, clock: &dyn Clock) -> TokenSet {
    TokenSet::new(
        Token::new(value, clock.utc_now() + Duration::seconds(expires_in_secs)),
        Some("refresh-0".to_string()),
    )
}
