// Image transform path: resize, contrast and parameter validation

use rstest::rstest;

use missionlens::api::ApiRequest;

use super::test_harness::{body_json, byte_fixture, jpeg_fixture, TestApp};

fn decode_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(bytes).expect("decodable output");
    (img.width(), img.height())
}

#[tokio::test]
async fn test_width_only_preserves_aspect_ratio() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(200, 100));

    let response = app.get("/image/abc?width=100&height=0").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("image/jpeg"));
    assert_eq!(response.header("Cache-Control"), Some("private, max-age=3600"));

    let declared: usize = response.header("Content-Length").unwrap().parse().unwrap();
    let body = response.into_bytes().await.unwrap();
    assert_eq!(body.len(), declared);
    assert_eq!(decode_dimensions(&body), (100, 50));
}

#[tokio::test]
async fn test_height_only_preserves_aspect_ratio() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(200, 100));

    let body = app
        .get("/image/abc?height=25")
        .await
        .into_bytes()
        .await
        .unwrap();
    assert_eq!(decode_dimensions(&body), (50, 25));
}

#[tokio::test]
async fn test_both_dimensions_resize_exactly() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(200, 100));

    let body = app
        .get("/image/abc?width=30&height=90")
        .await
        .into_bytes()
        .await
        .unwrap();
    assert_eq!(decode_dimensions(&body), (30, 90));
}

#[rstest]
#[case(1, 1000, "width=4096", (4, 4096))]
#[case(1000, 1, "height=4096", (4096, 4))]
#[case(2, 600, "width=4000", (14, 4096))]
#[tokio::test]
async fn test_extreme_aspect_ratio_is_bounded_by_limits(
    #[case] src_w: u32,
    #[case] src_h: u32,
    #[case] query: &str,
    #[case] expected: (u32, u32),
) {
    let app = TestApp::new();
    app.put_image("tall", jpeg_fixture(src_w, src_h));

    let response = app.get(&format!("/image/tall?{}", query)).await;
    assert_eq!(response.status, 200);
    let body = response.into_bytes().await.unwrap();
    assert_eq!(decode_dimensions(&body), expected);
}

#[tokio::test]
async fn test_contrast_only_keeps_dimensions() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(64, 48));

    let response = app.get("/image/abc?contrast=40").await;
    assert_eq!(response.status, 200);
    let body = response.into_bytes().await.unwrap();
    assert_eq!(decode_dimensions(&body), (64, 48));
}

#[tokio::test]
async fn test_contrast_zero_is_byte_identical_to_plain_request() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(64, 48));

    let plain = app.get("/image/abc").await;
    let plain_status = plain.status;
    let plain = plain.into_bytes().await.unwrap();

    let zero = app.get("/image/abc?contrast=0").await;
    assert_eq!(zero.status, plain_status);
    let zero = zero.into_bytes().await.unwrap();

    assert_eq!(zero, plain);
    assert_eq!(zero.as_ref(), jpeg_fixture(64, 48).as_slice());
}

#[tokio::test]
async fn test_transform_ignores_range_header() {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(80, 40));

    let request = ApiRequest::get("/image/abc?width=40").with_header("Range", "bytes=0-99");
    let response = app.send(request).await;
    assert_eq!(response.status, 200);
    assert!(response.header("Content-Range").is_none());

    let body = response.into_bytes().await.unwrap();
    assert_eq!(decode_dimensions(&body), (40, 20));
    assert_eq!(app.blobs.last_range(), None);
}

#[rstest]
#[case("width=-5", "invalid width")]
#[case("width=ten", "invalid width")]
#[case("width=5000", "invalid width")]
#[case("height=1.5", "invalid height")]
#[case("contrast=101", "invalid contrast")]
#[case("contrast=-250", "invalid contrast")]
#[case("contrast=NaN", "invalid contrast")]
#[case("contrast=bright", "invalid contrast")]
#[tokio::test]
async fn test_invalid_parameters_are_rejected(#[case] query: &str, #[case] message: &str) {
    let app = TestApp::new();
    app.put_image("abc", jpeg_fixture(16, 16));

    let response = app.get(&format!("/image/abc?{}", query)).await;
    assert_eq!(response.status, 400);
    assert_eq!(body_json(response).await, serde_json::json!({ "error": message }));
    assert!(app.blobs.requests().is_empty());
}

#[tokio::test]
async fn test_undecodable_source_is_500() {
    let app = TestApp::new();
    app.put_image("abc", byte_fixture(512));

    let response = app.get("/image/abc?width=10").await;
    assert_eq!(response.status, 500);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "failed to process image" })
    );
}

#[tokio::test]
async fn test_empty_parameters_stream_unchanged() {
    let app = TestApp::new();
    let source = jpeg_fixture(32, 32);
    app.put_image("abc", source.clone());

    let response = app.get("/image/abc?width=&height=&contrast=").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Accept-Ranges"), Some("bytes"));
    assert_eq!(response.into_bytes().await.unwrap().as_ref(), source.as_slice());
}
