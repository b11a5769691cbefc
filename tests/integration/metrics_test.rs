// Metrics endpoint and request accounting

use missionlens::api::ApiRequest;
use missionlens::metrics::DeliveryPath;

use super::test_harness::{byte_fixture, jpeg_fixture, TestApp};

async fn scrape(app: &TestApp) -> String {
    let response = app.get("/metrics").await;
    assert_eq!(response.status, 200);
    assert!(response
        .header("Content-Type")
        .unwrap()
        .starts_with("text/plain"));
    let body = response.into_bytes().await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn test_requests_are_counted_by_status() {
    let app = TestApp::new();
    app.seed_missions(1);

    let _ = app.get("/ping").await;
    let _ = app.get("/mission/m-000").await;
    let _ = app.get("/mission/nope").await;
    let _ = app.send(ApiRequest::new("POST", "/missions")).await;

    assert_eq!(app.metrics.get_request_count(), 4);
    assert_eq!(app.metrics.get_status_count(200), 2);
    assert_eq!(app.metrics.get_status_count(404), 1);
    assert_eq!(app.metrics.get_status_count(405), 1);

    let text = scrape(&app).await;
    assert!(text.contains("http_requests_total 4"));
    assert!(text.contains("http_requests_by_status_total{status=\"404\"} 1"));
    assert!(text.contains("http_requests_by_route_total{route=\"mission\"} 2"));
}

#[tokio::test]
async fn test_delivery_paths_are_counted() {
    let app = TestApp::new();
    app.put_image("raw", byte_fixture(50));
    app.put_image("pic", jpeg_fixture(40, 20));

    let _ = app.get("/image/raw").await;
    let _ = app
        .send(ApiRequest::get("/image/raw").with_header("Range", "bytes=0-9"))
        .await;
    let _ = app.get("/image/pic?width=20").await;

    assert_eq!(app.metrics.get_delivery_count(DeliveryPath::Stream), 2);
    assert_eq!(app.metrics.get_delivery_count(DeliveryPath::Transform), 1);

    let text = scrape(&app).await;
    assert!(text.contains("image_deliveries_total{path=\"stream\"} 2"));
    assert!(text.contains("image_deliveries_total{path=\"transform\"} 1"));
    assert!(text.contains("image_partial_deliveries_total 1"));
}

#[tokio::test]
async fn test_store_failures_and_bad_tokens_are_counted() {
    let app = TestApp::new();
    app.kv.set_unavailable(true);
    app.blobs.set_unavailable(true);

    let _ = app.get("/missions").await;
    let _ = app.get("/image/abc").await;
    app.kv.set_unavailable(false);
    let _ = app.get("/missions?nextToken=e30").await;

    let text = scrape(&app).await;
    assert!(text.contains("store_errors_total{store=\"kv\"} 1"));
    assert!(text.contains("store_errors_total{store=\"blob\"} 1"));
    assert!(text.contains("pagination_invalid_tokens_total 1"));
}

#[tokio::test]
async fn test_durations_are_recorded() {
    let app = TestApp::new();
    for _ in 0..5 {
        let _ = app.get("/ping").await;
    }

    let histogram = app.metrics.get_duration_percentiles();
    assert!(histogram.p50 >= 0.0);
    assert!(histogram.p99 >= histogram.p50);
}
