//! Prometheus metrics for the mock engine.
//!
//! Tracks served requests, proxy and callback outcomes, and live stream
//! subscribers.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Requests served on the mock listener
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mockdeck_requests_total",
        "Total number of requests served by mock APIs",
        &["method", "status", "mode"]  // mode: mock|proxy|unmatched
    )
    .unwrap();

    /// Time from request arrival to response ready, including configured delay
    pub static ref REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mockdeck_request_duration_ms",
        "Histogram of mock request handling time in milliseconds",
        &["mode"],
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap();

    /// Upstream exchanges for PROXY/AUTO APIs
    pub static ref PROXY_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "mockdeck_proxy_requests_total",
        "Total number of proxied requests by outcome",
        &["outcome"]  // outcome: success|error|timeout
    )
    .unwrap();

    pub static ref PROXY_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mockdeck_proxy_duration_ms",
        "Duration of upstream requests in milliseconds",
        &["outcome"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap();

    /// Webhook callbacks fired after responses
    pub static ref CALLBACKS_TOTAL: CounterVec = register_counter_vec!(
        "mockdeck_callbacks_total",
        "Total number of callbacks fired by outcome",
        &["outcome"]  // outcome: success|failure
    )
    .unwrap();

    pub static ref CALLBACK_DURATION_MS: HistogramVec = register_histogram_vec!(
        "mockdeck_callback_duration_ms",
        "Duration of callback requests in milliseconds",
        &["outcome"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .unwrap();

    /// Connected live stream subscribers
    pub static ref STREAM_SUBSCRIBERS: GaugeVec = register_gauge_vec!(
        "mockdeck_stream_subscribers",
        "Number of connected live stream subscribers",
        &["topic"]  // topic: project|user
    )
    .unwrap();

    /// Subscribers dropped because their queue was full or closed
    pub static ref STREAM_DROPS_TOTAL: CounterVec = register_counter_vec!(
        "mockdeck_stream_drops_total",
        "Total number of subscribers dropped by the broadcaster",
        &["reason"]  // reason: full|closed
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

pub fn record_request(method: &str, status: u16, mode: &str, duration_ms: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string(), mode])
        .inc();
    REQUEST_DURATION_MS
        .with_label_values(&[mode])
        .observe(duration_ms);
}

pub fn record_proxy(outcome: &str, duration_ms: u64) {
    PROXY_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
    PROXY_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms as f64);
}

pub fn record_callback(success: bool, duration_ms: u64) {
    let outcome = if success { "success" } else { "failure" };
    CALLBACKS_TOTAL.with_label_values(&[outcome]).inc();
    CALLBACK_DURATION_MS
        .with_label_values(&[outcome])
        .observe(duration_ms as f64);
}

pub fn set_subscribers(topic: &str, count: usize) {
    STREAM_SUBSCRIBERS
        .with_label_values(&[topic])
        .set(count as f64);
}

pub fn record_stream_drop(reason: &str) {
    STREAM_DROPS_TOTAL.with_label_values(&[reason]).inc();
}
