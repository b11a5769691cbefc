//! Pass-through body pump
//!
//! Copies a blob body into a response sink chunk by chunk. Headers are
//! already committed when this runs, so failures are reported in the
//! outcome instead of turning into an error response.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use thiserror::Error;

use crate::blob::BlobBody;

/// Writing to the client failed (usually a disconnect)
#[derive(Debug, Clone, Error)]
#[error("response sink failed: {0}")]
pub struct SinkError(pub String);

/// Destination of a streamed body
#[async_trait]
pub trait BodySink: Send {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkError>;

    /// Signal end of body
    async fn finish(&mut self) -> Result<(), SinkError>;
}

#[async_trait]
impl BodySink for Vec<u8> {
    async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), SinkError> {
        self.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// How a copy ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Completed { bytes: u64 },
    /// The store's stream failed mid-body
    SourceFailed { bytes: u64, error: String },
    /// The client went away or the write failed
    SinkFailed { bytes: u64, error: String },
}

impl CopyOutcome {
    pub fn bytes(&self) -> u64 {
        match self {
            CopyOutcome::Completed { bytes }
            | CopyOutcome::SourceFailed { bytes, .. }
            | CopyOutcome::SinkFailed { bytes, .. } => *bytes,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, CopyOutcome::Completed { .. })
    }
}

/// Copy `body` into `sink`. The body is dropped before returning on every
/// path, which releases the store connection.
pub async fn copy_body<S>(mut body: BlobBody, sink: &mut S) -> CopyOutcome
where
    S: BodySink + ?Sized,
{
    let mut bytes = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                return CopyOutcome::SourceFailed {
                    bytes,
                    error: err.to_string(),
                }
            }
        };
        let len = chunk.len() as u64;
        if let Err(err) = sink.write_chunk(chunk).await {
            return CopyOutcome::SinkFailed {
                bytes,
                error: err.to_string(),
            };
        }
        bytes += len;
    }
    drop(body);

    match sink.finish().await {
        Ok(()) => CopyOutcome::Completed { bytes },
        Err(err) => CopyOutcome::SinkFailed {
            bytes,
            error: err.to_string(),
        },
    }
}
