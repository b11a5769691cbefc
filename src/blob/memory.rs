//! In-memory blob store (HashMap storage) for tests and local runs

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::range::{content_range, parse_range_header};
use super::{BlobError, BlobObject, BlobStore, ObjectMetadata};

const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    etag: String,
    last_modified: String,
    cache_control: Option<String>,
}

/// A `get` call as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedGet {
    pub bucket: String,
    pub key: String,
    pub range: Option<String>,
}

/// Blob store that keeps objects in process memory.
///
/// Honours a single `bytes=` range the way S3 does (multi-range and
/// unparseable headers fall back to the whole object). Every request is
/// recorded so callers can assert what was forwarded.
#[derive(Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    requests: Arc<RwLock<Vec<RecordedGet>>>,
    chunk_size: usize,
    open_bodies: Arc<AtomicUsize>,
    /// Simulate errors if set
    simulate_unavailable: Arc<RwLock<bool>>,
    fail_after_chunks: Arc<RwLock<Option<usize>>>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            chunk_size: chunk_size.max(1),
            open_bodies: Arc::new(AtomicUsize::new(0)),
            simulate_unavailable: Arc::new(RwLock::new(false)),
            fail_after_chunks: Arc::new(RwLock::new(None)),
        }
    }

    /// Store an object with a synthetic ETag and fixed Last-Modified
    pub fn put(&self, bucket: &str, key: &str, content_type: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let etag = format!("\"{:016x}-{}\"", fingerprint(&data), data.len());
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                etag,
                last_modified: "Wed, 21 Oct 2015 07:28:00 GMT".to_string(),
                cache_control: None,
            },
        );
    }

    /// Set Cache-Control metadata on an existing object
    pub fn set_cache_control(&self, bucket: &str, key: &str, value: &str) {
        if let Some(object) = self
            .objects
            .write()
            .get_mut(&(bucket.to_string(), key.to_string()))
        {
            object.cache_control = Some(value.to_string());
        }
    }

    /// Enable outage simulation for testing
    pub fn set_unavailable(&self, enabled: bool) {
        *self.simulate_unavailable.write() = enabled;
    }

    /// Make bodies fail with a stream error after `chunks` chunks
    pub fn set_fail_after_chunks(&self, chunks: Option<usize>) {
        *self.fail_after_chunks.write() = chunks;
    }

    /// All requests seen so far, oldest first
    pub fn requests(&self) -> Vec<RecordedGet> {
        self.requests.read().clone()
    }

    /// Range header of the most recent request
    pub fn last_range(&self) -> Option<String> {
        self.requests.read().last().and_then(|r| r.range.clone())
    }

    /// Bodies handed out and not yet dropped
    pub fn open_bodies(&self) -> usize {
        self.open_bodies.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<BlobObject, BlobError> {
        self.requests.write().push(RecordedGet {
            bucket: bucket.to_string(),
            key: key.to_string(),
            range: range.map(str::to_string),
        });

        if *self.simulate_unavailable.read() {
            return Err(BlobError::Upstream("simulated blob store outage".to_string()));
        }

        let object = self
            .objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BlobError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;

        let total = object.data.len() as u64;
        let requested = range
            .and_then(parse_range_header)
            .and_then(|header| header.single_bytes_range().cloned());

        let (data, content_range_value) = match requested {
            Some(byte_range) => {
                let (start, end) = byte_range
                    .resolve(total)
                    .ok_or(BlobError::RangeNotSatisfiable { size: total })?;
                (
                    object.data.slice(start as usize..=end as usize),
                    Some(content_range(start, end, total)),
                )
            }
            None => (object.data.clone(), None),
        };

        let metadata = ObjectMetadata {
            content_type: Some(object.content_type),
            content_length: Some(data.len() as u64),
            etag: Some(object.etag),
            last_modified: Some(object.last_modified),
            cache_control: object.cache_control,
            content_range: content_range_value,
        };

        let mut chunks: Vec<Result<Bytes, BlobError>> = (0..data.len())
            .step_by(self.chunk_size)
            .map(|start| Ok(data.slice(start..(start + self.chunk_size).min(data.len()))))
            .collect();
        if let Some(limit) = *self.fail_after_chunks.read() {
            chunks.truncate(limit);
            chunks.push(Err(BlobError::Stream("simulated connection reset".to_string())));
        }

        let guard = BodyGuard::new(self.open_bodies.clone());
        let body = stream::iter(chunks)
            .map(move |chunk| {
                let _held = &guard;
                chunk
            })
            .boxed();

        Ok(BlobObject { metadata, body })
    }
}

/// Counts a live body; released when the stream is dropped
struct BodyGuard(Arc<AtomicUsize>);

impl BodyGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// FNV-1a
fn fingerprint(data: &[u8]) -> u64 {
    data.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}
