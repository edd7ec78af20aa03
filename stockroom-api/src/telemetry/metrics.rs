//! Prometheus Metrics Definitions
//!
//! Defines all Stockroom metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Item service operation latency buckets (seconds)
const ITEM_LATENCY_BUCKETS: &[f64] =
    &[0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<StockroomMetrics>> = Lazy::new(StockroomMetrics::new);

/// Container for all Stockroom metrics.
#[derive(Clone)]
pub struct StockroomMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Item service operations - labels: operation, outcome
    pub item_operations_total: CounterVec,

    /// Item service latency - labels: operation
    pub item_operation_duration_seconds: HistogramVec,

    /// Item reads by source - labels: source (cache/store)
    pub item_reads_total: CounterVec,
}

impl StockroomMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "stockroom_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "stockroom_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            item_operations_total: register_counter_vec!(
                "stockroom_item_operations_total",
                "Total number of item service operations",
                &["operation", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register item_operations_total: {}", e)))?,

            item_operation_duration_seconds: register_histogram_vec!(
                "stockroom_item_operation_duration_seconds",
                "Item service operation duration in seconds",
                &["operation"],
                ITEM_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register item_operation_duration_seconds: {}", e)))?,

            item_reads_total: register_counter_vec!(
                "stockroom_item_reads_total",
                "Item reads by the source that served them",
                &["source"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register item_reads_total: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one item service call. `outcome` is "ok" or an error class.
    pub fn record_item_operation(&self, operation: &str, outcome: &str, duration_secs: f64) {
        self.item_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.item_operation_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    pub fn record_item_read(&self, from_cache: bool) {
        let source = if from_cache { "cache" } else { "store" };
        self.item_reads_total.with_label_values(&[source]).inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Touch the registry so our metrics exist before the first scrape
    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e.message, "Stockroom metrics unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_item_operation() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        let before = metrics
            .item_operations_total
            .with_label_values(&["get", "not_found"])
            .get();
        metrics.record_item_operation("get", "not_found", 0.002);
        let after = metrics
            .item_operations_total
            .with_label_values(&["get", "not_found"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_record_item_read_sources() -> Result<(), String> {
        let metrics = METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))?;
        metrics.record_item_read(true);
        metrics.record_item_read(false);
        assert!(metrics.item_reads_total.with_label_values(&["cache"]).get() >= 1.0);
        assert!(metrics.item_reads_total.with_label_values(&["store"]).get() >= 1.0);
        Ok(())
    }
}
