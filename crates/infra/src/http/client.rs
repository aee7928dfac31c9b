use std::time::Duration;

use afasa_domain::constants::{
    DEFAULT_NETWORK_RETRIES, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BACKOFF_MS,
    MAX_RETRY_BACKOFF_MS,
};
use afasa_domain::ApiError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

/// HTTP client with a per-attempt timeout and bounded network retry.
///
/// Only transport failures are retried, and only for requests the caller
/// marks retry-safe. Any HTTP response, whatever its status, is returned to
/// the caller as is.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder.
    ///
    /// With `retry_safe` set, a timeout or connection failure is retried up
    /// to the configured number of attempts with exponential backoff.
    pub async fn send(&self, builder: RequestBuilder, retry_safe: bool) -> Result<Response, ApiError> {
        let attempts = if retry_safe { self.max_attempts.max(1) } else { 1 };

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                ApiError::InvalidRequest(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder.build().map_err(|err| ApiError::from(InfraError::from(err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            let outcome = match tokio::time::timeout(self.timeout, self.client.execute(request)).await {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(err)) => Err(ApiError::from(InfraError::from(err))),
                Err(_) => Err(ApiError::timeout(format!("no response within {:?}", self.timeout))),
            };

            match outcome {
                Ok(response) => {
                    debug!(attempt = attempt + 1, %method, %url, status = %response.status(), "received HTTP response");
                    return Ok(response);
                }
                Err(err) if err.is_retryable_network() && attempt + 1 < attempts => {
                    let delay = self.backoff_delay(attempt + 1);
                    warn!(
                        attempt = attempt + 1,
                        %method,
                        %url,
                        error = %err,
                        backoff_ms = delay.as_millis() as u64,
                        "HTTP request failed; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");
                    return Err(err);
                }
            }
        }

        Err(ApiError::network(
            afasa_domain::NetworkFailure::Other,
            "http client exhausted retries without producing a result",
        ))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier).min(Duration::from_millis(MAX_RETRY_BACKOFF_MS))
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: 1 + DEFAULT_NETWORK_RETRIES as usize,
            base_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout; an attempt that exceeds it fails as a network
    /// timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Configure the number of retries after the initial attempt.
    pub fn retries(self, retries: u32) -> Self {
        self.max_attempts(1 + retries as usize)
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient, ApiError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| ApiError::from(InfraError::from(err)))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use afasa_domain::NetworkFailure;
    use reqwest::{Method, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_with_retries(retries: u32) -> HttpClient {
        HttpClient::builder()
            .timeout(Duration::from_millis(200))
            .base_backoff(Duration::from_millis(5))
            .retries(retries)
            .build()
            .expect("http client")
    }

    fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn returns_successful_response_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_retries(2);
        let response =
            client.send(client.request(Method::GET, server.uri()), true).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn does_not_retry_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_retries(2);
        let response =
            client.send(client.request(Method::GET, server.uri()), true).await.expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn retries_timeouts_for_retry_safe_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client_with_retries(2);
        let result = client.send(client.request(Method::GET, server.uri()), true).await;

        assert!(matches!(result, Err(ApiError::Network { reason: NetworkFailure::Timeout, .. })));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_unsafe_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client_with_retries(2);
        let result = client.send(client.request(Method::POST, server.uri()), false).await;

        assert!(matches!(result, Err(ApiError::Network { reason: NetworkFailure::Timeout, .. })));
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn connection_refused_is_a_connection_failure() {
        let client = client_with_retries(1);
        let result = client.send(client.request(Method::GET, closed_port_url()), true).await;

        match result {
            Err(ApiError::Network { reason, .. }) => assert_eq!(reason, NetworkFailure::Connection),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles_and_is_capped() {
        let client = HttpClient::builder().base_backoff(Duration::from_millis(200)).build().unwrap();

        assert_eq!(client.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(client.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(client.backoff_delay(9), Duration::from_millis(MAX_RETRY_BACKOFF_MS));
    }
}
