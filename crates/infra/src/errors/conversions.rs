//! Conversions from transport errors into the domain taxonomy.

use afasa_domain::{ApiError, NetworkFailure};
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub ApiError);

impl From<InfraError> for ApiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl From<HttpError> for InfraError {
    fn from(err: HttpError) -> Self {
        let message = err.to_string();
        let api = if err.is_timeout() {
            ApiError::network(NetworkFailure::Timeout, message)
        } else if err.is_connect() {
            ApiError::network(NetworkFailure::Connection, message)
        } else if err.is_builder() {
            ApiError::InvalidRequest(message)
        } else if err.is_decode() {
            ApiError::InvalidResponse(message)
        } else {
            ApiError::network(NetworkFailure::Other, message)
        };
        Self(api)
    }
}
