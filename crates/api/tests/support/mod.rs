//! Shared fixtures for console integration tests

#![allow(dead_code)]

use std::sync::Arc;

use afasa_common::testing::{token_set, MockTokenRefresher};
use afasa_common::SystemClock;
use afasa_console::ConsoleContext;
use afasa_domain::{ApiConfig, CacheSettings, Config, OidcSettings};
use serde_json::{json, Value};
use wiremock::MockServer;

/// A console wired to a mock backend that also plays the identity provider
pub struct TestConsole {
    pub server: MockServer,
    pub refresher: Arc<MockTokenRefresher>,
    pub ctx: ConsoleContext,
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        api: ApiConfig::new(server.uri()),
        oidc: OidcSettings::new(
            format!("{}/realms/afasa", server.uri()),
            "afasa-portal",
            "http://localhost:3000/callback",
        ),
        cache: CacheSettings::default(),
    }
}

/// Console signed in with access token `"initial"`; refreshes yield
/// `"refreshed-1"`, `"refreshed-2"`, ...
pub async fn signed_in_console() -> TestConsole {
    let server = MockServer::start().await;
    let refresher = Arc::new(MockTokenRefresher::new());
    let ctx = ConsoleContext::with_refresher(config_for(&server), refresher.clone())
        .expect("console context");
    ctx.install_session(token_set("initial", 3600, &SystemClock));

    TestConsole { server, refresher, ctx }
}

pub fn item(id: &str, status: &str) -> Value {
    json!({ "id": id, "title": format!("Item {id}"), "status": status })
}

pub fn ids(data: Option<&Value>) -> Vec<String> {
    data.and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|i| i["id"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}
