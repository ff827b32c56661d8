mod common;

use common::TestApp;
use http::StatusCode;
use shared::error::ErrorCode;

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_uses_error_body() {
    let app = TestApp::new();
    let (status, body) = app.get("/pharmacies", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], ErrorCode::NotFound.code());
    assert!(body["error"].as_str().unwrap().contains("not found"));
}
