//! Integration tests for the HTTP transport

use anyhow::Result;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use place_photos::ProviderKind;
use place_photos::transport::HttpTransport;
use place_photos::transport::http::REQUEST_ID_HEADER;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

mod common;

use common::{mocks, test_utils};

fn router(server: &MockServer, provider: ProviderKind, quota_limit: u32) -> Router {
    HttpTransport::new(test_utils::service(server, provider, quota_limit)).create_router()
}

async fn send(router: &Router, method: Method, uri: &str) -> Result<(StatusCode, Value)> {
    let response = router
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok((status, body))
}

#[tokio::test]
async fn test_place_photos_returns_references_and_urls() -> Result<()> {
    let server = MockServer::start().await;
    mocks::mount_current(&server, "P1", test_utils::current_place("P1", 2), 1).await;
    let app = router(&server, ProviderKind::Current, 20);

    let (status, body) = send(&app, Method::GET, "/places/P1/photos?limit=2&width=400").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["place_id"], "P1");
    assert_eq!(body["provider"], "current");
    assert_eq!(body["references"].as_array().map(Vec::len), Some(2));

    let url = body["urls"][0].as_str().unwrap_or_default();
    assert!(url.starts_with(&server.uri()));
    assert!(url.ends_with("/v1/places/P1/photos/photo-0/media?maxWidthPx=400&key=test-key"));
    Ok(())
}

#[tokio::test]
async fn test_legacy_urls_use_default_width() -> Result<()> {
    let server = MockServer::start().await;
    mocks::mount_legacy(&server, "P1", test_utils::legacy_details(1), 1).await;
    let app = router(&server, ProviderKind::Legacy, 20);

    let (status, body) = send(&app, Method::GET, "/places/P1/photos").await?;
    assert_eq!(status, StatusCode::OK);
    let url = body["urls"][0].as_str().unwrap_or_default();
    assert!(url.contains("/maps/api/place/photo?maxwidth=800&photo_reference=legacy-ref-0&key=test-key"));
    Ok(())
}

#[tokio::test]
async fn test_exhausted_quota_is_still_ok_with_empty_lists() -> Result<()> {
    let server = MockServer::start().await;
    mocks::mount_current(&server, "P1", test_utils::current_place("P1", 1), 1).await;
    mocks::mount_current(&server, "P2", test_utils::current_place("P2", 1), 0).await;
    let app = router(&server, ProviderKind::Current, 1);

    send(&app, Method::GET, "/places/P1/photos").await?;
    let (status, body) = send(&app, Method::GET, "/places/P2/photos").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["references"], Value::Array(vec![]));
    assert_eq!(body["urls"], Value::Array(vec![]));

    let (_, quota) = send(&app, Method::GET, "/quota").await?;
    assert_eq!(quota["used"], 1);
    assert_eq!(quota["limit"], 1);
    assert_eq!(quota["remaining"], 0);
    Ok(())
}

#[tokio::test]
async fn test_quota_reset_endpoint() -> Result<()> {
    let server = MockServer::start().await;
    mocks::mount_status(&server, &test_utils::current_path("P1"), 500, 1).await;
    let app = router(&server, ProviderKind::Current, 5);

    let (status, body) = send(&app, Method::GET, "/places/P1/photos").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["urls"], Value::Array(vec![]));

    let (_, quota) = send(&app, Method::GET, "/quota").await?;
    assert_eq!(quota["used"], 1);

    let (status, quota) = send(&app, Method::POST, "/quota/reset").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quota["used"], 0);
    assert_eq!(quota["remaining"], 5);
    Ok(())
}

#[tokio::test]
async fn test_photo_url_endpoint() -> Result<()> {
    let server = MockServer::start().await;
    let app = router(&server, ProviderKind::Legacy, 20);

    let (status, body) = send(&app, Method::GET, "/photos/url?reference=abc&width=300").await?;
    assert_eq!(status, StatusCode::OK);
    let url = body["url"].as_str().unwrap_or_default();
    assert!(url.contains("maxwidth=300&photo_reference=abc"));

    let (status, body) = send(&app, Method::GET, "/photos/url?reference=").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["url"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn test_health_and_readiness() -> Result<()> {
    let server = MockServer::start().await;
    let app = router(&server, ProviderKind::Current, 20);

    let (status, body) = send(&app, Method::GET, "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Healthy");
    assert!(body["checks"].get("provider_credential").is_some());
    assert!(body["checks"].get("photo_quota").is_some());

    let (status, body) = send(&app, Method::GET, "/ready").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
    Ok(())
}

#[tokio::test]
async fn test_metrics_and_stats_reflect_resolutions() -> Result<()> {
    let server = MockServer::start().await;
    mocks::mount_current(&server, "P1", test_utils::current_place("P1", 1), 1).await;
    let app = router(&server, ProviderKind::Current, 20);

    send(&app, Method::GET, "/places/P1/photos").await?;
    send(&app, Method::GET, "/places/P1/photos").await?;

    let (status, body) = send(&app, Method::GET, "/metrics").await?;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap_or_default();
    assert!(text.contains("place_photos_resolutions_total 2"));
    assert!(text.contains("place_photos_cache_hits_total 1"));
    assert!(text.contains("place_photos_quota_used 1"));

    let (status, stats) = send(&app, Method::GET, "/stats").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["resolver"]["fetches"], 1);
    assert_eq!(stats["resolver"]["cache_entries"], 1);
    Ok(())
}
