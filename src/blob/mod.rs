//! Blob store collaborator
//!
//! Fetches an object by key, optionally restricted to a byte range, and
//! returns its metadata plus a chunked body stream. The body is consumed at
//! most once; dropping it releases the underlying connection.

pub mod memory;
pub mod range;
pub mod s3;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::fmt;
use thiserror::Error;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

/// Chunked object body
pub type BlobBody = BoxStream<'static, Result<Bytes, BlobError>>;

/// Metadata returned alongside an object body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    /// Length of the returned body (the range length for partial reads)
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    /// RFC 7231 HTTP-date
    pub last_modified: Option<String>,
    pub cache_control: Option<String>,
    /// Present only when the store honoured a byte range
    pub content_range: Option<String>,
}

/// An object fetched from the store
pub struct BlobObject {
    pub metadata: ObjectMetadata,
    pub body: BlobBody,
}

impl fmt::Debug for BlobObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobObject")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl BlobObject {
    /// Buffer the whole body in memory
    pub async fn collect(self) -> Result<Bytes, BlobError> {
        let capacity = self.metadata.content_length.unwrap_or(0) as usize;
        let buf = self
            .body
            .try_fold(BytesMut::with_capacity(capacity), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

/// Errors returned by blob store implementations
#[derive(Debug, Clone, Error)]
pub enum BlobError {
    #[error("object s3://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("range not satisfiable for object of {size} bytes")]
    RangeNotSatisfiable { size: u64 },

    #[error("blob store request failed: {0}")]
    Upstream(String),

    #[error("object body stream failed: {0}")]
    Stream(String),
}

/// Read-only blob store operations
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch `key` from `bucket`. `range` is an HTTP `Range` header value
    /// passed through verbatim.
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<BlobObject, BlobError>;
}
