use prometheus::{Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static AUTH_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let registry = Registry::new();

    let requests_total = match IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create http_requests_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let request_duration = match HistogramVec::new(
        prometheus::HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create http_request_duration_seconds metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    let auth_attempts = match IntCounterVec::new(
        Opts::new(
            "auth_attempts_total",
            "Authentication attempts by method and outcome",
        ),
        &["method", "outcome"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!("Failed to create auth_attempts_total metric: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    };

    for collector in [
        Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(request_duration.clone()),
        Box::new(auth_attempts.clone()),
    ] {
        if let Err(e) = registry.register(collector) {
            tracing::error!("Failed to register metrics collector: {}", e);
            panic!("Failed to initialize metrics: {}", e);
        }
    }

    // Initialize globals; repeated init (tests) is a no-op
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = AUTH_ATTEMPTS_TOTAL.set(auth_attempts);
}

/// Count an authentication attempt. `method` is "password" or the OAuth
/// provider name; `outcome` is "success" or the failure reason.
pub fn track_auth_attempt(method: &str, outcome: &str) {
    if let Some(counter) = AUTH_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[method, outcome]).inc();
    }
}

/// Render the registry in the Prometheus text exposition format.
pub fn render() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };

    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_default()
}
