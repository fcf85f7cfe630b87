//! Health and metrics endpoint tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;

use crate::common::TestApp;

#[tokio::test]
async fn test_liveness_is_always_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_readiness_reports_gateway() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    // The pool points at a database that may not exist.
    let status = response.status_code();
    assert!(status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["checks"]["gateway"]["online_users"], 0);
}

#[tokio::test]
async fn test_metrics_exposes_online_gauge() {
    let app = TestApp::new();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    assert!(response.text().contains("chat_relay_online_users"));
}
