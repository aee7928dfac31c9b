//! Authenticated backend client
//!
//! Every call carries the current bearer token. A 401 invalidates that token
//! and the call is replayed once with a refreshed one; a second 401 surfaces
//! as [`ApiError::Unauthenticated`]. Transport failures are retried by the
//! underlying [`HttpClient`] for idempotent requests only.

use std::sync::Arc;
use std::time::Instant;

use afasa_common::AccessTokenProvider;
use afasa_core::ApiPort;
use afasa_domain::{ApiConfig, ApiError, ApiRequest, ConsoleError, HttpMethod};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::InfraError;
use crate::http::HttpClient;

/// `User-Agent` sent with every backend request
pub const CONSOLE_USER_AGENT: &str = concat!("afasa-console/", env!("CARGO_PKG_VERSION"));

/// Backend client implementing [`ApiPort`]
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if the base URL is not an absolute
    /// http(s) URL or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, auth: Arc<dyn AccessTokenProvider>) -> afasa_domain::Result<Self> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .retries(config.network_retries)
            .base_backoff(config.retry_backoff())
            .user_agent(CONSOLE_USER_AGENT)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {e}")))?;

        Self::builder().base_url(&config.base_url).auth(auth).http_client(http).build()
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue `request` and return the decoded JSON body
    ///
    /// An empty body (including 204/205) decodes to `Value::Null`.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` when no token is available or the backend rejects
    ///   the refreshed token too. No request is sent without a token.
    /// - `Http` for any other non-2xx status.
    /// - `Network` after retries (if any) are exhausted.
    /// - `InvalidResponse` when a 2xx body is not JSON.
    #[instrument(level = "debug", skip_all, fields(request = %request))]
    pub async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let started = Instant::now();
        let url = self.url_for(&request)?;

        let token = self.auth.access_token().await?;
        let mut response = self.send(&request, &url, &token.value).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("access token rejected; refreshing and replaying once");
            self.auth.invalidate(&token.value);
            let refreshed = self.auth.access_token().await?;
            response = self.send(&request, &url, &refreshed.value).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                warn!("refreshed access token rejected");
                return Err(ApiError::Unauthenticated);
            }
        }

        let status = response.status();
        let result = Self::decode(response).await;
        match &result {
            Ok(_) => debug!(status = status.as_u16(), elapsed_ms = started.elapsed().as_millis() as u64, "request succeeded"),
            Err(err) => warn!(status = status.as_u16(), error = %err, "request failed"),
        }
        result
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {e}", request.path)))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: &ApiRequest, url: &Url, token: &str) -> Result<Response, ApiError> {
        let mut builder = self
            .http
            .request(reqwest_method(request.method), url.clone())
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        self.http.send(builder, request.idempotent).await
    }

    async fn decode(response: Response) -> Result<Value, ApiError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::http(status.as_u16(), body));
        }

        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Ok(Value::Null);
        }

        let text = response.text().await.map_err(|e| ApiError::from(InfraError::from(e)))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("body is not JSON: {e}")))
    }
}

#[async_trait]
impl ApiPort for ApiClient {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        Self::request(self, request).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.http.timeout())
            .finish_non_exhaustive()
    }
}

fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    auth: Option<Arc<dyn AccessTokenProvider>>,
    http: Option<HttpClient>,
}

impl ApiClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AccessTokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Use a preconfigured HTTP client instead of the defaults.
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the API client
    ///
    /// # Errors
    ///
    /// Returns `ConsoleError::Config` if the base URL or auth provider is
    /// missing or invalid.
    pub fn build(self) -> afasa_domain::Result<ApiClient> {
        let raw = self.base_url.ok_or_else(|| ConsoleError::Config("API base URL not set".into()))?;
        let auth = self.auth.ok_or_else(|| ConsoleError::Config("auth provider not set".into()))?;
        let base_url = parse_base_url(&raw)?;
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .user_agent(CONSOLE_USER_AGENT)
                .build()
                .map_err(|e| ConsoleError::Config(e.to_string()))?,
        };

        Ok(ApiClient { http, auth, base_url })
    }
}

fn parse_base_url(raw: &str) -> afasa_domain::Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| ConsoleError::Config(format!("invalid API base URL {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConsoleError::Config(format!("API base URL must be http(s): {raw}")));
    }
    // Joining relative paths needs a trailing slash or the last segment is
    // replaced.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use afasa_common::testing::{token_set, MockTokenRefresher};
    use afasa_common::{SystemClock, TokenSource};
    use afasa_domain::NetworkFailure;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct Harness {
        server: MockServer,
        refresher: Arc<MockTokenRefresher>,
        tokens: Arc<TokenSource>,
        client: ApiClient,
    }

    async fn harness() -> Harness {
        let server = MockServer::start().await;
        let refresher = Arc::new(MockTokenRefresher::new());
        let tokens = Arc::new(TokenSource::new(refresher.clone(), Duration::from_secs(60)));
        tokens.sign_in(token_set("initial", 3600, &SystemClock));
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(200))
            .base_backoff(Duration::from_millis(5))
            .retries(2)
            .build()
            .unwrap();
        let client = ApiClient::builder()
            .base_url(server.uri())
            .auth(tokens.clone())
            .http_client(http)
            .build()
            .unwrap();
        Harness { server, refresher, tokens, client }
    }

    #[tokio::test]
    async fn test_attaches_bearer_and_encodes_query() {
        let h = harness().await;
        Mock::given(method("GET"))
            .and(path("/api/ops/tasks"))
            .and(query_param("status", "open"))
            .and(header("Authorization", "Bearer initial"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "t1" }])))
            .expect(1)
            .mount(&h.server)
            .await;

        let value =
            h.client.request(ApiRequest::get("/api/ops/tasks").with_query("status", "open")).await.unwrap();

        assert_eq!(value, json!([{ "id": "t1" }]));
    }

    #[tokio::test]
    async fn test_base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/backend/api/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sub": "u1" })))
            .expect(1)
            .mount(&server)
            .await;
        let tokens = Arc::new(TokenSource::new(Arc::new(MockTokenRefresher::new()), Duration::from_secs(60)));
        tokens.sign_in(token_set("initial", 3600, &SystemClock));
        let client =
            ApiClient::builder().base_url(format!("{}/backend", server.uri())).auth(tokens).build().unwrap();

        let me = client.request(ApiRequest::get("/api/me")).await.unwrap();

        assert_eq!(me["sub"], "u1");
    }

    /// Validates the single refresh-and-replay on 401.
    ///
    /// Assertions:
    /// - The first attempt carries the stale token, the replay the refreshed one.
    /// - Exactly one refresh happens and the caller gets the data.
    #[tokio::test]
    async fn test_401_refreshes_and_replays_once() {
        let h = harness().await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer initial"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(header("Authorization", "Bearer refreshed-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&h.server)
            .await;

        let value = h.client.request(ApiRequest::get("/api/devices")).await.unwrap();

        assert_eq!(value, json!({ "ok": true }));
        assert_eq!(h.refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_401_is_unauthenticated() {
        let h = harness().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&h.server)
            .await;

        let err = h.client.request(ApiRequest::get("/api/devices")).await.unwrap_err();

        assert_eq!(err, ApiError::Unauthenticated);
        assert_eq!(h.refresher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_after_401_is_unauthenticated() {
        let h = harness().await;
        h.refresher.set_should_fail(true);
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&h.server)
            .await;

        let err = h.client.request(ApiRequest::post("/api/ops/tasks/t1/complete")).await.unwrap_err();

        assert_eq!(err, ApiError::Unauthenticated);
        assert!(!h.tokens.is_authenticated());
    }

    #[tokio::test]
    async fn test_signed_out_sends_nothing() {
        let h = harness().await;
        h.tokens.sign_out();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&h.server)
            .await;

        let err = h.client.request(ApiRequest::get("/api/me")).await.unwrap_err();

        assert_eq!(err, ApiError::Unauthenticated);
    }

    /// Validates that only idempotent calls are retried on network failure.
    ///
    /// Assertions:
    /// - A timed-out GET is attempted three times (one try plus two retries).
    /// - A timed-out POST is attempted once.
    #[tokio::test]
    async fn test_timeouts_retry_only_idempotent_requests() {
        let h = harness().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&h.server)
            .await;

        let get = h.client.request(ApiRequest::get("/slow")).await.unwrap_err();
        assert!(matches!(get, ApiError::Network { reason: NetworkFailure::Timeout, .. }));
        assert_eq!(h.server.received_requests().await.unwrap().len(), 3);

        let post = h.client.request(ApiRequest::post("/slow")).await.unwrap_err();
        assert!(matches!(post, ApiError::Network { reason: NetworkFailure::Timeout, .. }));
        assert_eq!(h.server.received_requests().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let h = harness().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
            .expect(1)
            .mount(&h.server)
            .await;

        let err = h.client.request(ApiRequest::get("/api/ops/snapshots")).await.unwrap_err();

        assert_eq!(err, ApiError::http(500, "database down"));
    }

    #[tokio::test]
    async fn test_empty_bodies_decode_to_null() {
        let h = harness().await;
        Mock::given(path("/no-content"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&h.server)
            .await;
        Mock::given(path("/empty"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&h.server)
            .await;

        assert_eq!(h.client.request(ApiRequest::post("/no-content")).await.unwrap(), Value::Null);
        assert_eq!(h.client.request(ApiRequest::get("/empty")).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_response() {
        let h = harness().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&h.server)
            .await;

        let err = h.client.request(ApiRequest::get("/api/me")).await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let h = harness().await;
        Mock::given(method("POST"))
            .and(path("/api/report/generate"))
            .and(body_json(json!({ "type": "daily", "format": "pdf" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "/r/1.pdf" })))
            .expect(1)
            .mount(&h.server)
            .await;

        let response = h
            .client
            .request(
                ApiRequest::post("/api/report/generate").with_body(json!({ "type": "daily", "format": "pdf" })),
            )
            .await
            .unwrap();

        assert_eq!(response["url"], "/r/1.pdf");
    }

    /// Validates the client built from configuration.
    ///
    /// Assertions:
    /// - Requests identify the console through `User-Agent`.
    #[tokio::test]
    async fn test_configured_client_sends_console_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/devices"))
            .and(header("User-Agent", CONSOLE_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        let tokens = Arc::new(TokenSource::new(Arc::new(MockTokenRefresher::new()), Duration::from_secs(60)));
        tokens.sign_in(token_set("initial", 3600, &SystemClock));
        let client = ApiClient::new(&ApiConfig::new(server.uri()), tokens).unwrap();

        let devices = client.request(ApiRequest::get("/api/devices")).await.unwrap();

        assert_eq!(devices, json!([]));
        assert!(CONSOLE_USER_AGENT.starts_with("afasa-console/"));
    }

    #[test]
    fn test_builder_rejects_missing_or_bad_config() {
        let auth: Arc<dyn AccessTokenProvider> =
            Arc::new(TokenSource::new(Arc::new(MockTokenRefresher::new()), Duration::from_secs(60)));

        assert!(matches!(ApiClient::builder().auth(auth.clone()).build(), Err(ConsoleError::Config(_))));
        assert!(matches!(
            ApiClient::builder().base_url("ftp://example.org").auth(auth.clone()).build(),
            Err(ConsoleError::Config(_))
        ));
        assert!(matches!(ApiClient::builder().base_url("http://localhost:8000").build(), Err(ConsoleError::Config(_))));
    }
}
