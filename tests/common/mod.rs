#![allow(dead_code)]

use place_photos::{
    PhotoResolver, PhotoService, ProviderEndpoints, ProviderKind, ResolverConfig, ServerConfig,
};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

pub const TEST_API_KEY: &str = "test-key";
pub const LEGACY_DETAILS_PATH: &str = "/maps/api/place/details/json";

/// Test utilities for integration testing
pub mod test_utils {
    use super::*;

    /// Resolver config aimed at the stub server
    pub fn resolver_config(server: &MockServer, provider: ProviderKind) -> ResolverConfig {
        ResolverConfig::new(TEST_API_KEY)
            .with_provider(provider)
            .with_endpoints(ProviderEndpoints::with_base(&server.uri()))
    }

    pub fn resolver(server: &MockServer, provider: ProviderKind, quota_limit: u32) -> PhotoResolver {
        let config = resolver_config(server, provider).with_quota_limit(quota_limit);
        PhotoResolver::from_config(&config).expect("resolver should build")
    }

    pub fn service(server: &MockServer, provider: ProviderKind, quota_limit: u32) -> PhotoService {
        let config = resolver_config(server, provider).with_quota_limit(quota_limit);
        PhotoService::new(ServerConfig::default(), &config).expect("service should build")
    }

    /// Legacy details body carrying `count` photo references
    pub fn legacy_details(count: usize) -> Value {
        let photos: Vec<Value> = (0..count)
            .map(|i| json!({ "photo_reference": format!("legacy-ref-{i}"), "width": 1024 }))
            .collect();
        json!({
            "status": "OK",
            "result": { "photos": photos }
        })
    }

    /// Current place body carrying `count` photo names for `place_id`
    pub fn current_place(place_id: &str, count: usize) -> Value {
        let photos: Vec<Value> = (0..count)
            .map(|i| json!({ "name": format!("places/{place_id}/photos/photo-{i}") }))
            .collect();
        json!({ "photos": photos })
    }

    pub fn current_path(place_id: &str) -> String {
        format!("/v1/places/{place_id}")
    }
}

/// Mount helpers for the provider stub
pub mod mocks {
    use super::*;

    pub async fn mount_legacy(server: &MockServer, place_id: &str, body: Value, expected: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(LEGACY_DETAILS_PATH))
            .and(query_param("place_id", place_id))
            .and(query_param("fields", "photos"))
            .and(query_param("key", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected)
            .mount(server)
            .await;
    }

    pub async fn mount_current(server: &MockServer, place_id: &str, body: Value, expected: impl Into<Times>) {
        mount_current_delayed(server, place_id, body, Duration::ZERO, expected).await;
    }

    pub async fn mount_current_delayed(
        server: &MockServer,
        place_id: &str,
        body: Value,
        delay: Duration,
        expected: impl Into<Times>,
    ) {
        Mock::given(method("GET"))
            .and(path(test_utils::current_path(place_id)))
            .and(query_param("fields", "photos"))
            .and(header("X-Goog-Api-Key", TEST_API_KEY))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(delay),
            )
            .expect(expected)
            .mount(server)
            .await;
    }

    /// Any request to `request_path` answers with `status`
    pub async fn mount_status(server: &MockServer, request_path: &str, status: u16, expected: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected)
            .mount(server)
            .await;
    }

    pub async fn mount_raw(server: &MockServer, request_path: &str, body: &str, expected: impl Into<Times>) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json"),
            )
            .expect(expected)
            .mount(server)
            .await;
    }
}

/// Assertion helpers
pub mod assertions {
    use place_photos::PhotoReference;

    pub fn tokens(references: &[PhotoReference]) -> Vec<&str> {
        references.iter().map(|r| r.token()).collect()
    }

    /// No request reaching the stub carried the credential in its query string
    pub async fn assert_key_not_in_query(server: &wiremock::MockServer) {
        let requests = server.received_requests().await.unwrap_or_default();
        assert!(!requests.is_empty(), "expected at least one request");
        for request in requests {
            let query = request.url.query().unwrap_or_default();
            assert!(
                !query.contains(super::TEST_API_KEY),
                "credential leaked into query: {query}"
            );
        }
    }
}
