mod common;

use axum::http::StatusCode;
use common::{response_json, TestApp};

#[tokio::test]
async fn readiness_reports_database_and_sessions() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let body = response_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["checks"]["database"]["status"], "up");
    assert_eq!(body["checks"]["sessions"]["status"], "up");
}

#[tokio::test]
async fn liveness_is_always_up() {
    let app = TestApp::new().await;
    let body = response_json(app.get("/health/live").await).await;
    assert_eq!(body["status"], "up");
}
