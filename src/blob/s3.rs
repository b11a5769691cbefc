//! S3-backed blob store

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::Client;
use futures::stream::{self, StreamExt};

use super::{BlobError, BlobObject, BlobStore, ObjectMetadata};

/// Blob store backed by an S3 client
#[derive(Clone, Debug)]
pub struct S3BlobStore {
    client: Client,
}

impl S3BlobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from shared SDK config. An endpoint override switches
    /// to path-style addressing (MinIO, LocalStack).
    pub fn from_sdk_config(sdk_config: &SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<BlobObject, BlobError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_range(range.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                    || err.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    BlobError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    BlobError::Upstream(DisplayErrorContext(&err).to_string())
                }
            })?;

        let metadata = ObjectMetadata {
            content_type: output.content_type,
            content_length: output.content_length.and_then(|len| u64::try_from(len).ok()),
            etag: output.e_tag,
            last_modified: output
                .last_modified
                .and_then(|ts| ts.fmt(DateTimeFormat::HttpDate).ok()),
            cache_control: output.cache_control,
            content_range: output.content_range,
        };

        Ok(BlobObject {
            metadata,
            body: into_chunks(output.body),
        })
    }
}

fn into_chunks(body: ByteStream) -> super::BlobBody {
    stream::unfold(Some(body), |state| async move {
        let mut body = state?;
        match body.next().await? {
            Ok(chunk) => Some((Ok(chunk), Some(body))),
            // Stop after the first error
            Err(err) => Some((Err(BlobError::Stream(err.to_string())), None)),
        }
    })
    .boxed()
}
