// Pass-through streaming: chunked bodies, mid-stream failures, release

use missionlens::api::ResponseBody;
use missionlens::blob::MemoryBlobStore;
use missionlens::gateway::{copy_body, CopyOutcome};

use super::test_harness::{byte_fixture, TestApp};

fn chunked_app(chunk_size: usize) -> TestApp {
    TestApp::with_blob_store(MemoryBlobStore::with_chunk_size(chunk_size))
}

#[tokio::test]
async fn test_large_object_streams_in_order() {
    let app = chunked_app(1024);
    let source = byte_fixture(10 * 1024 + 17);
    app.put_image("big", source.clone());

    let response = app.get("/image/big").await;
    assert_eq!(response.status, 200);
    let ResponseBody::Stream(body) = response.body else {
        panic!("expected a streamed body");
    };

    let mut sink = Vec::new();
    let outcome = copy_body(body, &mut sink).await;
    assert_eq!(
        outcome,
        CopyOutcome::Completed {
            bytes: source.len() as u64
        }
    );
    assert_eq!(sink, source);
    assert_eq!(app.blobs.open_bodies(), 0);
}

#[tokio::test]
async fn test_mid_stream_failure_is_reported_after_headers() {
    let app = chunked_app(100);
    app.put_image("flaky", byte_fixture(1000));
    app.blobs.set_fail_after_chunks(Some(3));

    let response = app.get("/image/flaky").await;
    // Headers were committed before the failure surfaced
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Length"), Some("1000"));

    let ResponseBody::Stream(body) = response.body else {
        panic!("expected a streamed body");
    };
    let mut sink = Vec::new();
    let outcome = copy_body(body, &mut sink).await;
    assert!(matches!(outcome, CopyOutcome::SourceFailed { bytes: 300, .. }));
    assert_eq!(sink.len(), 300);
    assert_eq!(app.blobs.open_bodies(), 0);
}

#[tokio::test]
async fn test_dropped_response_releases_body() {
    let app = chunked_app(16);
    app.put_image("abc", byte_fixture(256));

    let response = app.get("/image/abc").await;
    assert_eq!(app.blobs.open_bodies(), 1);
    drop(response);
    assert_eq!(app.blobs.open_bodies(), 0);
}

#[tokio::test]
async fn test_transform_reads_whole_object_before_responding() {
    let app = chunked_app(64);
    app.put_image("abc", super::test_harness::jpeg_fixture(120, 60));

    let response = app.get("/image/abc?width=60").await;
    assert_eq!(response.status, 200);
    assert!(matches!(response.body, ResponseBody::Bytes(_)));
    assert_eq!(app.blobs.open_bodies(), 0);
}

#[tokio::test]
async fn test_transform_with_failing_source_is_not_found() {
    let app = chunked_app(64);
    app.put_image("abc", super::test_harness::jpeg_fixture(120, 60));
    app.blobs.set_fail_after_chunks(Some(1));

    let response = app.get("/image/abc?width=60").await;
    assert_eq!(response.status, 404);
    assert_eq!(app.blobs.open_bodies(), 0);
}
