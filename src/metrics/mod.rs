//! Metrics and observability implementations

pub mod health;

use health::{
    HealthMonitor, HealthResponse, MonitoringConfig, PerformanceMetrics, ReadinessResponse,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;

use crate::resolver::{PhotoResolver, ResolverStats};

pub use health::{HealthCheck, HealthStatus};

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub performance: PerformanceMetrics,
    pub resolver: ResolverStats,
    pub custom_metrics: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrometheusMetrics {
    pub content_type: String,
    pub data: String,
}

pub struct MetricsProvider {
    health_monitor: Arc<HealthMonitor>,
    resolver: PhotoResolver,
    custom_metrics: Arc<RwLock<HashMap<String, AtomicU64>>>,
    config: MonitoringConfig,
}

impl MetricsProvider {
    pub fn new(
        config: MonitoringConfig,
        version: String,
        resolver: PhotoResolver,
        credential_configured: bool,
    ) -> Self {
        Self {
            health_monitor: Arc::new(HealthMonitor::new(
                config.clone(),
                version,
                resolver.clone(),
                credential_configured,
            )),
            resolver,
            custom_metrics: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn get_health_status(&self) -> HealthResponse {
        if self.config.enable_health_checks {
            self.health_monitor.run_system_health_checks().await;
        }
        self.health_monitor.get_health_status().await
    }

    pub async fn get_readiness_status(&self) -> ReadinessResponse {
        self.health_monitor.get_readiness_status().await
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.health_monitor.get_performance_metrics()
    }

    pub async fn get_metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            performance: self.get_performance_metrics(),
            resolver: self.resolver.stats(),
            custom_metrics: self.get_custom_metrics().await,
        }
    }

    pub async fn get_prometheus_metrics(&self) -> PrometheusMetrics {
        let performance = self.get_performance_metrics();
        let stats = self.resolver.stats();
        let custom_metrics = self.get_custom_metrics().await;

        let mut data = String::new();
        let mut metric = |name: &str, kind: &str, help: &str, value: String| {
            let _ = write!(
                data,
                "# HELP place_photos_{name} {help}\n# TYPE place_photos_{name} {kind}\nplace_photos_{name} {value}\n"
            );
        };

        metric("http_requests_total", "counter", "Total HTTP requests", performance.total_requests.to_string());
        metric("http_response_time_avg_ms", "gauge", "Average HTTP response time in milliseconds", performance.average_response_time_ms.to_string());
        metric("http_response_time_p95_ms", "gauge", "95th percentile HTTP response time in milliseconds", performance.p95_response_time_ms.to_string());
        metric("http_error_rate_percent", "gauge", "HTTP error rate percentage", performance.error_rate_percent.to_string());
        metric("active_connections", "gauge", "Current active connections", performance.active_connections.to_string());

        metric("resolutions_total", "counter", "Photo resolutions requested", stats.requests.to_string());
        metric("cache_hits_total", "counter", "Resolutions served from the reference cache", stats.cache_hits.to_string());
        metric("coalesced_total", "counter", "Resolutions that joined an in-flight fetch", stats.coalesced.to_string());
        metric("quota_exhausted_total", "counter", "Resolutions skipped because the quota was spent", stats.quota_exhausted.to_string());
        metric("provider_fetches_total", "counter", "Provider fetches issued", stats.fetches.to_string());
        metric("provider_failures_total", "counter", "Provider fetches that failed", stats.provider_failures.to_string());
        metric("cache_entries", "gauge", "Places held in the reference cache", stats.cache_entries.to_string());
        metric("quota_used", "gauge", "Provider fetches used this session", stats.quota.used.to_string());
        metric("quota_limit", "gauge", "Provider fetches allowed per session", stats.quota.limit.to_string());

        for (name, value) in custom_metrics {
            metric(&name, "gauge", &format!("Custom metric {name}"), value.to_string());
        }

        PrometheusMetrics {
            content_type: "text/plain; version=0.0.4; charset=utf-8".to_string(),
            data,
        }
    }

    pub fn record_request(&self, response_time: Duration, is_error: bool) {
        if self.config.enable_metrics {
            self.health_monitor
                .record_request(response_time.as_millis() as f64, is_error);
        }
    }

    pub fn increment_active_connections(&self) {
        if self.config.enable_metrics {
            self.health_monitor.increment_active_connections();
        }
    }

    pub fn decrement_active_connections(&self) {
        if self.config.enable_metrics {
            self.health_monitor.decrement_active_connections();
        }
    }

    pub async fn increment_custom_metric(&self, name: &str, value: u64) {
        if !self.config.enable_metrics {
            return;
        }

        let mut metrics = self.custom_metrics.write().await;
        metrics
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    pub async fn get_custom_metrics(&self) -> HashMap<String, f64> {
        let metrics = self.custom_metrics.read().await;
        metrics
            .iter()
            .map(|(name, value)| (name.clone(), value.load(Ordering::Relaxed) as f64))
            .collect()
    }

    /// Refresh health checks in the background every
    /// `health_check_interval_seconds`.
    pub fn start_periodic_health_checks(&self) {
        if !self.config.enable_health_checks {
            return;
        }

        let health_monitor = self.health_monitor.clone();
        let interval_seconds = self.config.health_check_interval_seconds;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));

            loop {
                interval.tick().await;
                health_monitor.run_system_health_checks().await;
            }
        });

        tracing::info!("Started periodic health checks every {}s", interval_seconds);
    }

    pub fn health_monitor(&self) -> &HealthMonitor {
        &self.health_monitor
    }
}
