//! HTTP transport implementation

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::metrics::{HealthStatus, MetricsProvider};
use crate::server::PhotoService;

/// Header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP transport exposing the photo service as JSON
#[derive(Clone)]
pub struct HttpTransport {
    port: u16,
    host: String,
    cors_origins: Vec<String>,
    service: PhotoService,
}

/// Query parameters for photo lookups
#[derive(Debug, Default, Deserialize)]
pub struct PhotosQuery {
    pub limit: Option<usize>,
    pub width: Option<u32>,
}

/// Query parameters for URL building
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub reference: String,
    pub width: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub url: Option<String>,
}

impl HttpTransport {
    /// Create a transport bound to the service's configured host and port
    pub fn new(service: PhotoService) -> Self {
        let config = service.config().clone();
        Self {
            port: config.port,
            host: config.host,
            cors_origins: config.cors_origins,
            service,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn cors_layer(&self) -> CorsLayer {
        let mut cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);

        if self.cors_origins.iter().any(|origin| origin == "*") {
            cors = cors.allow_origin(Any);
        } else {
            let origins: Vec<HeaderValue> = self
                .cors_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            cors = cors.allow_origin(origins);
        }
        cors
    }

    /// Create the Axum router with all routes and middleware
    pub fn create_router(&self) -> Router {
        let metrics_provider = self.service.metrics().clone();

        Router::new()
            .route("/places/{place_id}/photos", get(handle_place_photos))
            .route("/photos/url", get(handle_photo_url))
            .route("/quota", get(handle_quota))
            .route("/quota/reset", post(handle_quota_reset))
            // Health and monitoring endpoints
            .route("/health", get(handle_health_check))
            .route("/ready", get(handle_readiness_check))
            .route("/metrics", get(handle_metrics))
            .route("/stats", get(handle_stats))
            .layer(self.cors_layer())
            .layer(middleware::from_fn_with_state(
                metrics_provider,
                metrics_middleware,
            ))
            .layer(middleware::from_fn(request_id_middleware))
            .with_state(self.service.clone())
    }

    /// Bind and serve until the listener fails
    pub async fn start(&self) -> Result<()> {
        let addr = self.address();
        info!("Starting HTTP transport on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

        self.service.metrics().start_periodic_health_checks();
        info!("HTTP server listening on http://{}", addr);

        axum::serve(listener, self.create_router())
            .await
            .context("HTTP server error")?;

        Ok(())
    }

    /// Log final counters before the process exits
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down HTTP transport");
        self.service.resolver().log_stats();
        Ok(())
    }
}

/// Photos for one place; always 200, empty lists when nothing is available
async fn handle_place_photos(
    State(service): State<PhotoService>,
    Path(place_id): Path<String>,
    Query(query): Query<PhotosQuery>,
) -> impl IntoResponse {
    debug!("Photo lookup for place {}", place_id);
    let photos = service.photos_for(&place_id, query.limit, query.width).await;
    Json(photos)
}

async fn handle_photo_url(
    State(service): State<PhotoService>,
    Query(query): Query<UrlQuery>,
) -> impl IntoResponse {
    let url = service.url_for_token(&query.reference, query.width);
    let status = if url.is_some() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(UrlResponse { url }))
}

async fn handle_quota(State(service): State<PhotoService>) -> impl IntoResponse {
    Json(service.quota())
}

async fn handle_quota_reset(State(service): State<PhotoService>) -> impl IntoResponse {
    Json(service.reset_quota())
}

/// Health check endpoint
async fn handle_health_check(State(service): State<PhotoService>) -> Response {
    let health_response = service.metrics().get_health_status().await;
    let status_code = match health_response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still serving requests
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health_response)).into_response()
}

/// Readiness check endpoint
async fn handle_readiness_check(State(service): State<PhotoService>) -> Response {
    let readiness_response = service.metrics().get_readiness_status().await;
    let status_code = if readiness_response.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness_response)).into_response()
}

/// Prometheus-style metrics endpoint
async fn handle_metrics(State(service): State<PhotoService>) -> Response {
    let prometheus_metrics = service.metrics().get_prometheus_metrics().await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus_metrics.content_type)],
        prometheus_metrics.data,
    )
        .into_response()
}

/// JSON stats endpoint
async fn handle_stats(State(service): State<PhotoService>) -> Response {
    let stats = service.metrics().get_metrics_snapshot().await;
    (StatusCode::OK, Json(stats)).into_response()
}

/// Tag each request with an id, in the tracing span and the response headers
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "http_request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Metrics collection middleware
async fn metrics_middleware(
    State(metrics_provider): State<Arc<MetricsProvider>>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = std::time::Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    metrics_provider.increment_active_connections();

    let response = next.run(request).await;

    let response_time = start_time.elapsed();
    let is_error = response.status().is_client_error() || response.status().is_server_error();
    metrics_provider.record_request(response_time, is_error);

    if path.starts_with("/places/") {
        metrics_provider
            .increment_custom_metric("place_photo_requests", 1)
            .await;
    }

    metrics_provider.decrement_active_connections();

    debug!(
        "Request {} {} completed in {}ms with status {}",
        method,
        path,
        response_time.as_millis(),
        response.status()
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ResolverConfig, ServerConfig};

    fn transport(host: &str, port: u16) -> HttpTransport {
        let service = PhotoService::new(
            ServerConfig {
                host: host.to_string(),
                port,
                ..ServerConfig::default()
            },
            &ResolverConfig::new("k"),
        )
        .unwrap();
        HttpTransport::new(service)
    }

    #[test]
    fn test_http_transport_creation() {
        let transport = transport("127.0.0.1", 3001);
        assert_eq!(transport.port, 3001);
        assert_eq!(transport.address(), "127.0.0.1:3001");
        assert_eq!(transport.cors_origins, vec!["*"]);
    }

    #[test]
    fn test_photos_query_defaults() {
        let query: PhotosQuery = serde_json::from_str("{}").unwrap();
        assert!(query.limit.is_none());
        assert!(query.width.is_none());
    }

    #[test]
    fn test_url_response_serialization() {
        let json = serde_json::to_string(&UrlResponse { url: None }).unwrap();
        assert_eq!(json, r#"{"url":null}"#);
    }
}
