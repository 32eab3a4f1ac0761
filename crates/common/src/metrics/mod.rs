//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Finsheet metrics
pub const METRICS_PREFIX: &str = "finsheet";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_workbooks_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total workbooks ingested"
    );

    describe_counter!(
        format!("{}_rows_ingested_total", METRICS_PREFIX),
        Unit::Count,
        "Total sheet rows persisted"
    );

    describe_counter!(
        format!("{}_ingestion_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Total failed ingestions, by stage and error code"
    );

    describe_histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Workbook ingestion latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a successful ingestion
pub fn record_ingestion(duration_secs: f64, rows: usize, schema: &str) {
    counter!(
        format!("{}_workbooks_ingested_total", METRICS_PREFIX),
        "schema" => schema.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_rows_ingested_total", METRICS_PREFIX),
        "schema" => schema.to_string()
    )
    .increment(rows as u64);

    histogram!(
        format!("{}_ingestion_duration_seconds", METRICS_PREFIX)
    )
    .record(duration_secs);
}

/// Helper to record a failed ingestion
pub fn record_ingestion_failure(stage: &str, code: &str) {
    counter!(
        format!("{}_ingestion_failures_total", METRICS_PREFIX),
        "stage" => stage.to_string(),
        "code" => code.to_string()
    )
    .increment(1);
}
