// Test harness: a MissionApi wired to in-memory collaborators

use bytes::Bytes;
use image::{ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use missionlens::api::{ApiRequest, ApiResponse, AppContext, MissionApi};
use missionlens::blob::MemoryBlobStore;
use missionlens::config::Config;
use missionlens::kv::MemoryStore;
use missionlens::metrics::Metrics;
use missionlens::model::MissionRecord;

pub const TABLE: &str = "missions";
pub const BUCKET: &str = "sat-images";

pub struct TestApp {
    pub api: MissionApi,
    pub kv: MemoryStore,
    pub blobs: MemoryBlobStore,
    pub metrics: Arc<Metrics>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_blob_store(MemoryBlobStore::new())
    }

    pub fn with_blob_store(blobs: MemoryBlobStore) -> Self {
        let config = Config::from_lookup(|name| match name {
            "MISSION_TABLE" => Some(TABLE.to_string()),
            "SAT_IMAGES_BUCKET" => Some(BUCKET.to_string()),
            _ => None,
        })
        .expect("test config");

        let kv = MemoryStore::new(config.store.partition_key.clone());
        kv.create_table(TABLE);
        let metrics = Arc::new(Metrics::new());

        let ctx = AppContext {
            kv: Arc::new(kv.clone()),
            blobs: Arc::new(blobs.clone()),
            config: Arc::new(config),
            metrics: metrics.clone(),
        };

        Self {
            api: MissionApi::new(ctx),
            kv,
            blobs,
            metrics,
        }
    }

    /// Seed `n` missions with ids `m-000`, `m-001`, ...
    pub fn seed_missions(&self, n: usize) {
        for i in 0..n {
            self.kv
                .put_item(TABLE, mission(&format!("m-{:03}", i)).to_item())
                .expect("seed mission");
        }
    }

    /// Store an image under the default key layout
    pub fn put_image(&self, id: &str, data: impl Into<Bytes>) {
        self.blobs
            .put(BUCKET, &format!("images/{}.jpg", id), "image/jpeg", data);
    }

    pub async fn get(&self, path_and_query: &str) -> ApiResponse {
        self.api.handle(ApiRequest::get(path_and_query)).await
    }

    pub async fn send(&self, request: ApiRequest) -> ApiResponse {
        self.api.handle(request).await
    }
}

pub fn mission(id: &str) -> MissionRecord {
    MissionRecord {
        id: id.to_string(),
        name: format!("Mission {}", id),
        status: "scheduled".to_string(),
        priority: 3,
        target_satellite_id: "sat-target-7".to_string(),
        observer_satellite_id: "sat-observer-2".to_string(),
        tca: 1_700_000_000,
        min_range_km: 12.5,
        collection_window_start: 1_699_999_900,
        collection_window_end: 1_700_000_100,
        collection_type: "optical".to_string(),
        pointing_target: "nadir".to_string(),
        image_ids: vec![format!("{}-img-0", id)],
    }
}

/// A JPEG with a two-axis gradient
pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 255 / width) as u8, (y * 255 / height) as u8, 96])
    });
    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageOutputFormat::Jpeg(90))
        .expect("encode fixture");
    buffer.into_inner()
}

/// Deterministic non-image payload
pub fn byte_fixture(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub async fn body_json(response: ApiResponse) -> serde_json::Value {
    let bytes = response.into_bytes().await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
