use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock as TokioRwLock;

use crate::resolver::PhotoResolver;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, HealthStatus::Degraded)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub message: String,
    pub last_checked: SystemTime,
}

impl HealthCheck {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Healthy, message)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Degraded, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy, message)
    }

    fn with_status(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            last_checked: SystemTime::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub uptime_seconds: u64,
    pub version: String,
    pub checks: HashMap<String, HealthCheck>,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: HashMap<String, HealthCheck>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_requests: u64,
    pub requests_per_minute: f64,
    pub average_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub error_rate_percent: f64,
    pub active_connections: usize,
}

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub enable_health_checks: bool,
    pub enable_metrics: bool,
    pub health_check_interval_seconds: u64,
    /// Provider failure share of fetches above which the provider is degraded
    pub provider_failure_threshold_percent: f64,
    pub error_rate_threshold_percent: f64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_health_checks: true,
            enable_metrics: true,
            health_check_interval_seconds: 30,
            provider_failure_threshold_percent: 50.0,
            error_rate_threshold_percent: 5.0,
        }
    }
}

/// Samples kept for latency percentiles and the error rate
const REQUEST_WINDOW: usize = 1000;

#[derive(Debug)]
struct RequestMetrics {
    /// (response time in ms, was an error), oldest first
    samples: VecDeque<(f64, bool)>,
    last_minute_requests: VecDeque<Instant>,
}

impl RequestMetrics {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(REQUEST_WINDOW),
            last_minute_requests: VecDeque::new(),
        }
    }

    fn add_request(&mut self, response_time_ms: f64, is_error: bool) {
        let now = Instant::now();

        self.samples.push_back((response_time_ms, is_error));
        if self.samples.len() > REQUEST_WINDOW {
            self.samples.pop_front();
        }

        self.last_minute_requests.push_back(now);
        while self
            .last_minute_requests
            .front()
            .is_some_and(|&time| now.duration_since(time) > Duration::from_secs(60))
        {
            self.last_minute_requests.pop_front();
        }
    }

    fn calculate_percentile(&self, percentile: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let mut sorted_times: Vec<f64> = self.samples.iter().map(|&(time, _)| time).collect();
        sorted_times.sort_by(|a, b| a.total_cmp(b));

        let index = ((percentile / 100.0) * (sorted_times.len() - 1) as f64) as usize;
        sorted_times[index.min(sorted_times.len() - 1)]
    }

    fn average_response_time(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|&(time, _)| time).sum::<f64>() / self.samples.len() as f64
    }

    fn requests_per_minute(&self) -> f64 {
        self.last_minute_requests.len() as f64
    }

    /// Error share of the samples currently in the window
    fn error_rate_percent(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let errors = self.samples.iter().filter(|&&(_, is_error)| is_error).count();
        (errors as f64 / self.samples.len() as f64) * 100.0
    }
}

pub struct HealthMonitor {
    config: MonitoringConfig,
    start_time: Instant,
    version: String,
    resolver: PhotoResolver,
    credential_configured: bool,
    health_checks: Arc<TokioRwLock<HashMap<String, HealthCheck>>>,
    request_metrics: RwLock<RequestMetrics>,
    total_requests: AtomicU64,
    active_connections: AtomicUsize,
}

impl HealthMonitor {
    pub fn new(
        config: MonitoringConfig,
        version: String,
        resolver: PhotoResolver,
        credential_configured: bool,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            version,
            resolver,
            credential_configured,
            health_checks: Arc::new(TokioRwLock::new(HashMap::new())),
            request_metrics: RwLock::new(RequestMetrics::new()),
            total_requests: AtomicU64::new(0),
            active_connections: AtomicUsize::new(0),
        }
    }

    pub async fn get_health_status(&self) -> HealthResponse {
        let checks = self.health_checks.read().await.clone();
        let overall_status = Self::calculate_overall_status(&checks);

        HealthResponse {
            status: overall_status,
            timestamp: chrono::Utc::now(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: self.version.clone(),
            checks,
            metrics: self.get_performance_metrics(),
        }
    }

    /// Ready once a credential is configured; quota exhaustion does not
    /// make the service unready since callers still get (empty) answers.
    pub async fn get_readiness_status(&self) -> ReadinessResponse {
        let mut checks = self.health_checks.read().await.clone();
        let credential = self.check_credential();
        let ready = credential.status.is_healthy();
        checks.insert("provider_credential".to_string(), credential);

        ReadinessResponse {
            ready,
            timestamp: chrono::Utc::now(),
            checks,
        }
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let metrics = self.request_metrics.read();

        PerformanceMetrics {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            requests_per_minute: metrics.requests_per_minute(),
            average_response_time_ms: metrics.average_response_time(),
            p95_response_time_ms: metrics.calculate_percentile(95.0),
            error_rate_percent: metrics.error_rate_percent(),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }

    pub async fn update_health_check(&self, name: impl Into<String>, check: HealthCheck) {
        self.health_checks.write().await.insert(name.into(), check);
    }

    pub async fn run_system_health_checks(&self) {
        let start_time = Instant::now();

        self.update_health_check("provider_credential", self.check_credential())
            .await;
        self.update_health_check("photo_quota", self.check_quota()).await;
        self.update_health_check("provider", self.check_provider()).await;
        self.update_health_check("performance", self.check_performance())
            .await;

        tracing::debug!(
            "Health checks completed in {}ms",
            start_time.elapsed().as_millis()
        );
    }

    pub fn record_request(&self, response_time_ms: f64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.request_metrics
            .write()
            .add_request(response_time_ms, is_error);
    }

    pub fn increment_active_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn calculate_overall_status(checks: &HashMap<String, HealthCheck>) -> HealthStatus {
        if checks
            .values()
            .any(|check| matches!(check.status, HealthStatus::Unhealthy))
        {
            HealthStatus::Unhealthy
        } else if checks.values().any(|check| !check.status.is_healthy()) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    fn check_credential(&self) -> HealthCheck {
        if self.credential_configured {
            HealthCheck::healthy(format!(
                "{} provider credential configured",
                self.resolver.provider_kind()
            ))
        } else {
            HealthCheck::unhealthy("No provider credential configured")
        }
    }

    fn check_quota(&self) -> HealthCheck {
        let quota = self.resolver.quota().snapshot();
        if quota.remaining == 0 {
            HealthCheck::degraded(format!(
                "Photo quota exhausted: {}/{} fetches used",
                quota.used, quota.limit
            ))
        } else {
            HealthCheck::healthy(format!(
                "Photo quota: {}/{} fetches used",
                quota.used, quota.limit
            ))
        }
    }

    fn check_provider(&self) -> HealthCheck {
        let stats = self.resolver.stats();
        if stats.fetches == 0 {
            return HealthCheck::healthy("No provider fetches yet");
        }

        let failure_rate = stats.provider_failures as f64 / stats.fetches as f64 * 100.0;
        if failure_rate > self.config.provider_failure_threshold_percent {
            HealthCheck::degraded(format!(
                "Provider failing: {} of {} fetches failed",
                stats.provider_failures, stats.fetches
            ))
        } else {
            HealthCheck::healthy(format!(
                "Provider ok: {} of {} fetches failed",
                stats.provider_failures, stats.fetches
            ))
        }
    }

    fn check_performance(&self) -> HealthCheck {
        let error_rate = self.request_metrics.read().error_rate_percent();

        if error_rate > self.config.error_rate_threshold_percent {
            HealthCheck::degraded(format!("High HTTP error rate: {:.1}%", error_rate))
        } else {
            HealthCheck::healthy(format!("HTTP error rate: {:.1}%", error_rate))
        }
    }
}
