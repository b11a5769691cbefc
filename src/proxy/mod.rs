// Proxy module - Pingora ProxyHttp implementation
// Every request is answered locally in request_filter; nothing is proxied
// upstream.

pub mod helpers;

use async_trait::async_trait;
use bytes::Bytes;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;

use crate::api::{ApiResponse, MissionApi, ResponseBody, REQUEST_ID_HEADER};
use crate::gateway::{copy_body, BodySink, CopyOutcome, SinkError};

/// MissionLensProxy implements the Pingora ProxyHttp trait on top of
/// [`MissionApi`]
pub struct MissionLensProxy {
    api: Arc<MissionApi>,
}

impl MissionLensProxy {
    pub fn new(api: Arc<MissionApi>) -> Self {
        Self { api }
    }

    async fn write_response(&self, session: &mut Session, response: ApiResponse) -> Result<()> {
        let request_id = response
            .header(REQUEST_ID_HEADER)
            .unwrap_or_default()
            .to_string();

        let mut header = ResponseHeader::build(response.status, Some(response.headers.len()))?;
        for (name, value) in &response.headers {
            header.insert_header(name.clone(), value.as_str())?;
        }

        match response.body {
            ResponseBody::Empty => {
                session
                    .write_response_header(Box::new(header), true)
                    .await?;
            }
            ResponseBody::Bytes(body) => {
                session
                    .write_response_header(Box::new(header), false)
                    .await?;
                session.write_response_body(Some(body), true).await?;
            }
            ResponseBody::Stream(body) => {
                session
                    .write_response_header(Box::new(header), false)
                    .await?;

                // Headers are committed; a failed copy is logged, not retried
                let mut sink = SessionSink { session };
                let outcome = copy_body(body, &mut sink).await;
                let metrics = self.api.metrics();
                metrics.add_bytes_streamed(outcome.bytes());
                match outcome {
                    CopyOutcome::Completed { .. } => {}
                    CopyOutcome::SourceFailed { bytes, error } => {
                        metrics.increment_streams_interrupted();
                        tracing::warn!(request_id = %request_id, bytes_sent = bytes, error = %error, "Object stream failed mid-body");
                    }
                    CopyOutcome::SinkFailed { bytes, error } => {
                        metrics.increment_streams_interrupted();
                        tracing::info!(request_id = %request_id, bytes_sent = bytes, error = %error, "Client went away mid-body");
                    }
                }
            }
        }
        Ok(())
    }
}

/// Writes streamed chunks straight to the downstream session
struct SessionSink<'a> {
    session: &'a mut Session,
}

#[async_trait]
impl BodySink for SessionSink<'_> {
    async fn write_chunk(&mut self, chunk: Bytes) -> std::result::Result<(), SinkError> {
        self.session
            .write_response_body(Some(chunk), false)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }

    async fn finish(&mut self) -> std::result::Result<(), SinkError> {
        self.session
            .write_response_body(None, true)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

#[async_trait]
impl ProxyHttp for MissionLensProxy {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    /// Never reached: request_filter answers every request
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "no upstream: requests are served locally",
        ))
    }

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        let request = helpers::to_api_request(session.req_header());
        let response = self.api.handle(request).await;
        self.write_response(session, response).await?;
        Ok(true) // Short-circuit (response already sent)
    }
}
