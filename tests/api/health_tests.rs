//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::{expect_json, TestApp};

/// Test basic health check endpoint returns 200 OK with a status field
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let json = expect_json(app.get("/health").await, StatusCode::OK).await;

    assert_eq!(json["status"], "healthy");
    assert!(json.get("version").is_some());
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let json = expect_json(app.get("/health/live").await, StatusCode::OK).await;

    assert_eq!(json["status"], "alive");
}

/// Test readiness probe reports the store and the gateway
#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new();

    let json = expect_json(app.get("/health/ready").await, StatusCode::OK).await;

    assert_eq!(json["checks"]["store"]["status"], "healthy");
    assert_eq!(json["checks"]["gateway"]["online_users"], 0);
}

/// Test readiness fails once the dispatcher has been shut down
#[tokio::test]
async fn test_readiness_after_dispatcher_shutdown() {
    let app = TestApp::new();
    app.state.gateway.dispatcher().shutdown().await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

/// Test metrics endpoint serves Prometheus text
#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    chat_relay::infrastructure::metrics::record_message("delivered");

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("chat_relay_messages_total"));
}
