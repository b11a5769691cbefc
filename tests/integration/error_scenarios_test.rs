// Error scenarios across the HTTP surface

use rstest::rstest;

use missionlens::api::ApiRequest;

use super::test_harness::{body_json, jpeg_fixture, TestApp};

#[tokio::test]
async fn test_unknown_image_is_404_without_detail() {
    let app = TestApp::new();

    let response = app.get("/image/missing").await;
    assert_eq!(response.status, 404);
    let body = response.into_bytes().await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text, r#"{"error":"object not found"}"#);
    assert!(!text.contains("sat-images"));
    assert!(!text.contains("images/missing.jpg"));
}

#[tokio::test]
async fn test_unknown_image_with_transform_is_404() {
    let app = TestApp::new();

    let response = app.get("/image/missing?width=10").await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_blob_outage_maps_to_404() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(8, 8));
    app.blobs.set_unavailable(true);

    let response = app.get("/image/abc").await;
    assert_eq!(response.status, 404);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "object not found" })
    );
}

#[tokio::test]
async fn test_image_without_id_is_400() {
    let app = TestApp::new();

    let response = app.get("/image/").await;
    assert_eq!(response.status, 400);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "missing id" })
    );
    assert!(app.blobs.requests().is_empty());
}

#[rstest]
#[case("/")]
#[case("/unknown")]
#[case("/image/a/b")]
#[case("/missions/extra/segments")]
#[tokio::test]
async fn test_unknown_path_is_404(#[case] path: &str) {
    let app = TestApp::new();

    let response = app.get(path).await;
    assert_eq!(response.status, 404);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "not found" })
    );
}

#[rstest]
#[case("POST", "/missions")]
#[case("PUT", "/mission/m-1")]
#[case("DELETE", "/image/abc")]
#[case("POST", "/ping")]
#[tokio::test]
async fn test_non_get_method_is_405(#[case] method: &str, #[case] path: &str) {
    let app = TestApp::new();

    let response = app.send(ApiRequest::new(method, path)).await;
    assert_eq!(response.status, 405);
    assert_eq!(response.header("Allow"), Some("GET"));
    assert!(app.blobs.requests().is_empty());
}

#[tokio::test]
async fn test_every_response_carries_request_id() {
    let app = TestApp::new();

    let ok = app.get("/ping").await;
    let missing = app.get("/nowhere").await;
    let first = ok.header("X-Request-Id").unwrap().to_string();
    let second = missing.header("X-Request-Id").unwrap().to_string();

    assert_eq!(first.len(), 36);
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_ping() {
    let app = TestApp::new();

    let response = app.get("/ping").await;
    assert_eq!(response.status, 200);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "message": "pong" })
    );
}
