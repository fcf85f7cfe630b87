//! Prometheus Metrics Module
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Online users (registered gateway connections)
//! - Registry events and relay delivery outcomes
//! - Relay failures by error code
//! - Friend request lifecycle events
//! - Database pool statistics

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "chat_relay";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Users with a registered gateway connection
pub static ONLINE_USERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("online_users", "Users with a registered gateway connection")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create ONLINE_USERS metric")
});

/// Relay deliveries by outcome ("delivered", "offline", "queue_full", "closed")
pub static RELAY_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("relay_deliveries_total", "Live delivery attempts by outcome")
            .namespace(NAMESPACE),
        &["outcome"],
    )
    .expect("Failed to create RELAY_DELIVERIES_TOTAL metric")
});

/// Registry events ("registered", "superseded")
pub static CONNECTION_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("connection_events_total", "Gateway connection registry events")
            .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create CONNECTION_EVENTS_TOTAL metric")
});

/// Per-message relay failures by error code
pub static RELAY_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("relay_failures_total", "Inbound messages rejected by the relay")
            .namespace(NAMESPACE),
        &["code"],
    )
    .expect("Failed to create RELAY_FAILURES_TOTAL metric")
});

/// Friend request events ("sent", "accepted", "declined")
pub static FRIEND_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("friend_requests_total", "Friend request lifecycle events")
            .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create FRIEND_REQUESTS_TOTAL metric")
});

/// Database connection pool stats
pub static DB_POOL_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("db_pool_connections", "Database connection pool statistics")
            .namespace(NAMESPACE),
        &["state"], // "idle", "active"
    )
    .expect("Failed to create DB_POOL_CONNECTIONS metric")
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(ONLINE_USERS.clone()))
        .expect("Failed to register ONLINE_USERS");
    registry
        .register(Box::new(RELAY_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register RELAY_DELIVERIES_TOTAL");
    registry
        .register(Box::new(CONNECTION_EVENTS_TOTAL.clone()))
        .expect("Failed to register CONNECTION_EVENTS_TOTAL");
    registry
        .register(Box::new(RELAY_FAILURES_TOTAL.clone()))
        .expect("Failed to register RELAY_FAILURES_TOTAL");
    registry
        .register(Box::new(FRIEND_REQUESTS_TOTAL.clone()))
        .expect("Failed to register FRIEND_REQUESTS_TOTAL");
    registry
        .register(Box::new(DB_POOL_CONNECTIONS.clone()))
        .expect("Failed to register DB_POOL_CONNECTIONS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

pub fn set_online_users(count: usize) {
    ONLINE_USERS.set(count as i64);
}

pub fn record_delivery(outcome: &str) {
    RELAY_DELIVERIES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_connection_event(event: &str) {
    CONNECTION_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_relay_failure(code: &str) {
    RELAY_FAILURES_TOTAL.with_label_values(&[code]).inc();
}

pub fn record_friend_request(event: &str) {
    FRIEND_REQUESTS_TOTAL.with_label_values(&[event]).inc();
}

/// Helper to update database pool stats
pub fn update_db_pool_stats(idle: u32, active: u32) {
    DB_POOL_CONNECTIONS.with_label_values(&["idle"]).set(idle as f64);
    DB_POOL_CONNECTIONS.with_label_values(&["active"]).set(active as f64);
}
