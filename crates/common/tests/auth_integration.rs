//! Integration tests for the auth module
//!
//! Drives `OidcClient` against a mock token endpoint and checks that
//! `TokenSource` refreshes through it.

#![cfg(feature = "platform")]

use std::sync::Arc;
use std::time::Duration;

use afasa_common::auth::{AuthFailureReason, OidcClient, OidcError, TokenSource};
use afasa_common::testing::token_set;
use afasa_common::time::SystemClock;
use afasa_domain::OidcSettings;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/realms/afasa/protocol/openid-connect/token";

fn settings(server: &MockServer) -> OidcSettings {
    OidcSettings::new(
        format!("{}/realms/afasa", server.uri()),
        "afasa-portal",
        "http://localhost:3000/callback",
    )
}

fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "expires_in": 300,
        "refresh_expires_in": 1800,
        "token_type": "Bearer",
        "id_token": "id.jwt",
        "scope": "openid profile email"
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = serde_json::Value::String(refresh.to_string());
    }
    body
}

fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Validates the authorization-code exchange.
///
/// Assertions:
/// - The token request is a form POST carrying the code and PKCE verifier.
/// - The returned token set carries the access, refresh and ID tokens.
#[tokio::test]
async fn test_exchange_code_posts_pkce_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-1", Some("rt-1"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = OidcClient::new(settings(&server)).unwrap();
    let (url, state) = client.authorization_url();
    assert_eq!(query_param(&url, "state").as_deref(), Some(state.as_str()));

    let tokens = client.exchange_code("abc123", &state).await.unwrap();

    assert_eq!(tokens.access.value, "at-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(tokens.id_token.as_deref(), Some("id.jwt"));
}

/// Validates the refresh grant.
///
/// Assertions:
/// - A response without a new refresh token keeps the old one.
#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt-0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("at-2", None)))
        .mount(&server)
        .await;

    let client = OidcClient::new(settings(&server))?;
    let tokens = client.refresh_tokens("rt-0").await?;

    assert_eq!(tokens.access.value, "at-2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-0"));
    Ok(())
}

/// Validates provider error parsing.
///
/// Assertions:
/// - A 400 `invalid_grant` response surfaces as `OidcError::Provider`.
#[tokio::test]
async fn test_refresh_rejected_by_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Session not active"
        })))
        .mount(&server)
        .await;

    let client = OidcClient::new(settings(&server)).unwrap();
    let err = client.refresh_tokens("rt-0").await.unwrap_err();

    match err {
        OidcError::Provider(provider) => {
            assert_eq!(provider.error, "invalid_grant");
            assert_eq!(provider.error_description.as_deref(), Some("Session not active"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Validates `TokenSource` refreshing through the real OIDC client.
///
/// Assertions:
/// - Eight concurrent callers with an expired token cause one token request.
/// - All receive the refreshed token.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_token_source_single_flight_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("at-refreshed", Some("rt-1")))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(OidcClient::new(settings(&server)).unwrap());
    let tokens = Arc::new(TokenSource::new(client, Duration::from_secs(60)));
    tokens.sign_in(token_set("expired", -10, &SystemClock));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tokens = Arc::clone(&tokens);
            tokio::spawn(async move { tokens.current_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().value, "at-refreshed");
    }
}

/// Validates that a rejected refresh is terminal for the token source.
///
/// Assertions:
/// - The caller receives `RefreshFailed`.
/// - The token endpoint is not called again on the next request.
#[tokio::test]
async fn test_token_source_refresh_failure_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_grant\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(OidcClient::new(settings(&server)).unwrap());
    let tokens = TokenSource::new(client, Duration::from_secs(60));
    tokens.sign_in(token_set("expired", -10, &SystemClock));

    let first = tokens.current_token().await.unwrap_err();
    let second = tokens.current_token().await.unwrap_err();

    assert_eq!(first.reason, AuthFailureReason::RefreshFailed);
    assert_eq!(second.reason, AuthFailureReason::RefreshFailed);
}
