//! Image delivery gateway
//!
//! Serves one image request through one of two paths:
//!
//! - **stream**: no transform requested. The inbound `Range` header is
//!   forwarded verbatim, object metadata is mirrored onto the response and
//!   the body is pumped through without buffering.
//! - **transform**: the whole object is fetched (any range is ignored),
//!   decoded, resized and/or contrast-adjusted, re-encoded, and returned as
//!   a single buffer with an exact `Content-Length`.
//!
//! Once a request enters the transform path it never falls back to
//! streaming. Store failures of any kind surface as 404; decode and encode
//! failures surface as 500. Detail goes to the log only.

pub mod stream;

use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::blob::{BlobBody, BlobError, BlobObject, BlobStore};
use crate::error::ApiError;
use crate::metrics::{DeliveryPath, Metrics};
use crate::transform::{
    process_image, DimensionLimits, ImageError, TransformOptions, TransformRequest,
};

pub use stream::{copy_body, BodySink, CopyOutcome, SinkError};

/// Cache-Control for streamed objects that carry none of their own
pub const DEFAULT_STREAM_CACHE_CONTROL: &str = "private, max-age=60";
/// Cache-Control for transformed images
pub const TRANSFORM_CACHE_CONTROL: &str = "private, max-age=3600";

/// How an image id maps to an object key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    /// `images/<id>.jpg`
    #[default]
    Prefixed,
    /// `<id>.jpg`
    Flat,
}

impl KeyLayout {
    pub fn object_key(&self, image_id: &str) -> String {
        match self {
            KeyLayout::Prefixed => format!("images/{}.jpg", image_id),
            KeyLayout::Flat => format!("{}.jpg", image_id),
        }
    }
}

/// Response body of a delivery
pub enum DeliveryBody {
    /// Pass-through body, copied with [`copy_body`]
    Stream(BlobBody),
    /// Fully encoded transform output
    Buffered(Bytes),
}

/// A committed image response: status, headers, body
pub struct Delivery {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: DeliveryBody,
    pub path: DeliveryPath,
}

impl Delivery {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Gateway settings taken from configuration
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub bucket: String,
    pub key_layout: KeyLayout,
    pub limits: DimensionLimits,
    pub transform: TransformOptions,
}

pub struct ImageGateway {
    blobs: Arc<dyn BlobStore>,
    settings: GatewaySettings,
    metrics: Arc<Metrics>,
}

impl ImageGateway {
    pub fn new(blobs: Arc<dyn BlobStore>, settings: GatewaySettings, metrics: Arc<Metrics>) -> Self {
        Self {
            blobs,
            settings,
            metrics,
        }
    }

    /// Parse `width`/`height`/`contrast` from the query string
    pub fn parse_transform(
        &self,
        query: &HashMap<String, String>,
    ) -> Result<TransformRequest, ApiError> {
        TransformRequest::from_query(query, self.settings.limits).map_err(|err| match &err {
            ImageError::InvalidParameter { param, .. } => {
                ApiError::validation(param.invalid_message(), err.to_string())
            }
            _ => ApiError::validation("invalid transform parameters", err.to_string()),
        })
    }

    /// Serve `image_id`, choosing the stream or transform path
    pub async fn deliver(
        &self,
        image_id: &str,
        range: Option<&str>,
        request: &TransformRequest,
    ) -> Result<Delivery, ApiError> {
        if image_id.is_empty() {
            return Err(ApiError::validation("missing id", "empty image id"));
        }

        let key = self.settings.key_layout.object_key(image_id);
        if request.needs_processing() {
            self.deliver_transformed(&key, request).await
        } else {
            self.deliver_stream(&key, range).await
        }
    }

    async fn deliver_stream(&self, key: &str, range: Option<&str>) -> Result<Delivery, ApiError> {
        let object = self.fetch(key, range).await?;
        let meta = object.metadata;

        let mut headers: Vec<(&'static str, String)> = Vec::with_capacity(8);
        if let Some(content_type) = meta.content_type {
            headers.push(("Content-Type", content_type));
        }
        if let Some(len) = meta.content_length {
            headers.push(("Content-Length", len.to_string()));
        }
        if let Some(etag) = meta.etag {
            headers.push(("ETag", etag));
        }
        if let Some(last_modified) = meta.last_modified {
            headers.push(("Last-Modified", last_modified));
        }
        headers.push((
            "Cache-Control",
            meta.cache_control
                .unwrap_or_else(|| DEFAULT_STREAM_CACHE_CONTROL.to_string()),
        ));
        headers.push(("Accept-Ranges", "bytes".to_string()));

        let status = match meta.content_range {
            Some(content_range) => {
                headers.push(("Content-Range", content_range));
                206
            }
            None => 200,
        };

        self.metrics
            .record_delivery(DeliveryPath::Stream, status == 206);

        Ok(Delivery {
            status,
            headers,
            body: DeliveryBody::Stream(object.body),
            path: DeliveryPath::Stream,
        })
    }

    async fn deliver_transformed(
        &self,
        key: &str,
        request: &TransformRequest,
    ) -> Result<Delivery, ApiError> {
        let object = self.fetch(key, None).await?;
        let source = object.collect().await.map_err(|err| self.fetch_failed(key, err))?;
        let source_len = source.len();

        let started = Instant::now();
        let request = *request;
        let options = self.settings.transform;
        let processed =
            tokio::task::spawn_blocking(move || process_image(&source, &request, &options))
                .await
                .map_err(|err| {
                    self.metrics.increment_transform_failures();
                    tracing::error!(key = %key, error = %err, "Transform task aborted");
                    ApiError::Decode(format!("transform task aborted: {}", err))
                })?
                .map_err(|err| {
                    self.metrics.increment_transform_failures();
                    tracing::warn!(key = %key, error = %err, "Failed to process image");
                    match err {
                        ImageError::EncodeFailed { .. } => ApiError::Encode(err.to_string()),
                        _ => ApiError::Decode(err.to_string()),
                    }
                })?;

        tracing::debug!(
            key = %key,
            source_bytes = source_len,
            output_bytes = processed.data.len(),
            source_size = ?processed.source_size,
            output_size = ?processed.output_size,
            duration_ms = started.elapsed().as_millis() as u64,
            "Image transformed"
        );

        let body = Bytes::from(processed.data);
        self.metrics.record_delivery(DeliveryPath::Transform, false);
        self.metrics.add_bytes_transformed(body.len() as u64);

        Ok(Delivery {
            status: 200,
            headers: vec![
                ("Content-Type", processed.content_type.to_string()),
                ("Content-Length", body.len().to_string()),
                ("Cache-Control", TRANSFORM_CACHE_CONTROL.to_string()),
            ],
            body: DeliveryBody::Buffered(body),
            path: DeliveryPath::Transform,
        })
    }

    async fn fetch(&self, key: &str, range: Option<&str>) -> Result<BlobObject, ApiError> {
        self.blobs
            .get(&self.settings.bucket, key, range)
            .await
            .map_err(|err| self.fetch_failed(key, err))
    }

    fn fetch_failed(&self, key: &str, err: BlobError) -> ApiError {
        match &err {
            BlobError::NotFound { .. } => {
                tracing::info!(bucket = %self.settings.bucket, key = %key, "Image object not found");
            }
            _ => {
                self.metrics.increment_store_error("blob");
                tracing::warn!(
                    bucket = %self.settings.bucket,
                    key = %key,
                    error = %err,
                    "Failed to fetch image object"
                );
            }
        }
        ApiError::not_found("object not found")
    }
}
