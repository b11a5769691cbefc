// Configuration loading through the public API

use std::io::Write;
use tempfile::NamedTempFile;

use missionlens::api::{ApiRequest, AppContext, MissionApi};
use missionlens::blob::MemoryBlobStore;
use missionlens::config::Config;
use missionlens::kv::MemoryStore;
use missionlens::metrics::Metrics;
use std::sync::Arc;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(yaml.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[test]
fn test_load_prefers_existing_file() {
    let file = write_config(
        r#"
store:
  table: "file-table"
  bucket: "file-bucket"
"#,
    );
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.store.table, "file-table");
    assert_eq!(config.store.bucket, "file-bucket");
}

#[test]
fn test_malformed_file_is_an_error() {
    let file = write_config("store: [not, a, map]");
    assert!(Config::load(file.path()).is_err());
}

#[test]
fn test_missing_store_section_is_an_error() {
    let file = write_config("server:\n  port: 8081\n");
    assert!(Config::from_file(file.path()).is_err());
}

#[tokio::test]
async fn test_configured_page_size_and_key_layout_are_honoured() {
    let file = write_config(
        r#"
store:
  table: "missions"
  bucket: "raw"
  image_key_layout: flat
pagination:
  default_count: 2
  max_count: 3
"#,
    );
    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();

    let kv = MemoryStore::new("id");
    for id in ["a", "b", "c", "d", "e"] {
        let mut item = missionlens::kv::Item::new();
        item.insert("id".to_string(), missionlens::kv::ItemValue::Str(id.to_string()));
        kv.put_item("missions", item).unwrap();
    }
    let blobs = MemoryBlobStore::new();
    blobs.put("raw", "abc.jpg", "image/jpeg", &b"flat-layout"[..]);

    let api = MissionApi::new(AppContext {
        kv: Arc::new(kv),
        blobs: Arc::new(blobs),
        config: Arc::new(config),
        metrics: Arc::new(Metrics::new()),
    });

    let body = api
        .handle(ApiRequest::get("/missions"))
        .await
        .into_bytes()
        .await
        .unwrap();
    let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["missions"].as_array().unwrap().len(), 2);

    let body = api
        .handle(ApiRequest::get("/missions?count=50"))
        .await
        .into_bytes()
        .await
        .unwrap();
    let page: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(page["missions"].as_array().unwrap().len(), 3);

    let image = api.handle(ApiRequest::get("/image/abc")).await;
    assert_eq!(image.status, 200);
    assert_eq!(image.into_bytes().await.unwrap().as_ref(), b"flat-layout");
}
