//! Transport-agnostic HTTP surface
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/ping` | `{"message":"pong"}` |
//! | GET | `/missions?count&nextToken` | page of missions |
//! | GET | `/mission/:id` | one mission |
//! | GET | `/image/:id?width&height&contrast` | image bytes (Range aware) |
//! | GET | `/metrics` | Prometheus text |
//!
//! [`MissionApi::handle`] turns an [`ApiRequest`] into an [`ApiResponse`].
//! It never touches a socket, so the whole surface can be driven from
//! tests with in-memory stores; the proxy module adapts it to Pingora.

pub mod missions;

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::blob::{BlobBody, BlobError, BlobStore};
use crate::config::Config;
use crate::error::ApiError;
use crate::gateway::{DeliveryBody, GatewaySettings, ImageGateway};
use crate::kv::KeyValueStore;
use crate::metrics::Metrics;
use crate::transform::{EncoderQuality, TransformOptions};

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
const JSON_CONTENT_TYPE: &str = "application/json";
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Parse a raw query string into decoded key-value pairs.
///
/// Keys without `=` map to an empty value; later duplicates win.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                urlencoding::decode(key).unwrap_or_default().into_owned(),
                urlencoding::decode(value).unwrap_or_default().into_owned(),
            )
        })
        .collect()
}

/// An inbound request, stripped of transport detail
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
}

impl ApiRequest {
    pub fn new(method: &str, path_and_query: &str) -> Self {
        let (path, query) = path_and_query
            .split_once('?')
            .unwrap_or((path_and_query, ""));
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query: parse_query_string(query),
            headers: HashMap::new(),
        }
    }

    pub fn get(path_and_query: &str) -> Self {
        Self::new("GET", path_and_query)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Response body
pub enum ResponseBody {
    Empty,
    Bytes(Bytes),
    /// Streamed from the blob store
    Stream(BlobBody),
}

/// An outbound response, ready to be written by a transport
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn bytes(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            status,
            headers: vec![
                ("Content-Type".to_string(), content_type.to_string()),
                ("Content-Length".to_string(), body.len().to_string()),
            ],
            body: ResponseBody::Bytes(body),
        }
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::bytes(status, JSON_CONTENT_TYPE, value.to_string())
    }

    pub fn error(err: &ApiError) -> Self {
        Self::bytes(err.to_http_status(), JSON_CONTENT_TYPE, err.to_json_body())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    /// Buffer the whole body, draining a stream if there is one
    pub async fn into_bytes(self) -> Result<Bytes, BlobError> {
        match self.body {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Bytes(bytes) => Ok(bytes),
            ResponseBody::Stream(body) => body
                .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                    buf.extend_from_slice(&chunk);
                    Ok(buf)
                })
                .await
                .map(BytesMut::freeze),
        }
    }
}

/// Shared, read-only handles passed to every request
#[derive(Clone)]
pub struct AppContext {
    pub kv: Arc<dyn KeyValueStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: Arc<Config>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Ping,
    Metrics,
    Missions,
    Mission(String),
    Image(String),
}

impl Route {
    fn name(&self) -> &'static str {
        match self {
            Route::Ping => "ping",
            Route::Metrics => "metrics",
            Route::Missions => "missions",
            Route::Mission(_) => "mission",
            Route::Image(_) => "image",
        }
    }

    fn resolve(path: &str) -> Option<Route> {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        match path {
            "/ping" => return Some(Route::Ping),
            "/metrics" => return Some(Route::Metrics),
            "/missions" => return Some(Route::Missions),
            "/mission" => return Some(Route::Mission(String::new())),
            "/image" => return Some(Route::Image(String::new())),
            _ => {}
        }
        if let Some(id) = path.strip_prefix("/mission/") {
            return single_segment(id).map(Route::Mission);
        }
        if let Some(id) = path.strip_prefix("/image/") {
            return single_segment(id).map(Route::Image);
        }
        None
    }
}

fn single_segment(raw: &str) -> Option<String> {
    if raw.contains('/') {
        return None;
    }
    Some(
        urlencoding::decode(raw)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| raw.to_string()),
    )
}

/// Request handler for the whole HTTP surface
pub struct MissionApi {
    ctx: AppContext,
    gateway: ImageGateway,
}

impl MissionApi {
    pub fn new(ctx: AppContext) -> Self {
        let config = &ctx.config;
        let settings = GatewaySettings {
            bucket: config.store.bucket.clone(),
            key_layout: config.store.image_key_layout,
            limits: config.images.limits(),
            transform: TransformOptions {
                policy: config.images.output,
                quality: EncoderQuality::with_quality(config.images.jpeg_quality),
                limits: config.images.limits(),
                max_source_pixels: config.images.max_source_pixels,
            },
        };
        let gateway = ImageGateway::new(ctx.blobs.clone(), settings, ctx.metrics.clone());
        Self { ctx, gateway }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.ctx.metrics
    }

    /// Handle one request. Always produces a response; errors become JSON
    /// bodies with a generic message.
    pub async fn handle(&self, request: ApiRequest) -> ApiResponse {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let route = Route::resolve(&request.path);
        let route_name = route.as_ref().map_or("unmatched", Route::name);

        let result = match route {
            None => Err(ApiError::not_found("not found")),
            Some(_) if request.method != "GET" => Err(ApiError::MethodNotAllowed),
            Some(route) => self.dispatch(route, &request).await,
        };

        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                let status = err.to_http_status();
                if status >= 500 {
                    tracing::error!(request_id = %request_id, path = %request.path, error = %err, "Request failed");
                } else {
                    tracing::debug!(request_id = %request_id, path = %request.path, error = %err, "Request rejected");
                }
                if matches!(err, ApiError::MethodNotAllowed) {
                    let mut response = ApiResponse::error(&err);
                    response.set_header("Allow", "GET");
                    response
                } else {
                    ApiResponse::error(&err)
                }
            }
        };
        response.set_header(REQUEST_ID_HEADER, request_id.clone());

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let metrics = &self.ctx.metrics;
        metrics.increment_request_count();
        metrics.increment_status_count(response.status);
        metrics.increment_route_count(route_name);
        metrics.record_duration(duration_ms);

        tracing::info!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            route = route_name,
            status = response.status,
            duration_ms = duration_ms,
            "Request completed"
        );

        response
    }

    async fn dispatch(&self, route: Route, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        match route {
            Route::Ping => Ok(ApiResponse::json(
                200,
                &serde_json::json!({ "message": "pong" }),
            )),
            Route::Metrics => Ok(ApiResponse::bytes(
                200,
                PROMETHEUS_CONTENT_TYPE,
                self.ctx.metrics.export_prometheus(),
            )),
            Route::Missions => self.list_missions(&request.query).await,
            Route::Mission(id) => self.get_mission(&id).await,
            Route::Image(id) => self.get_image(&id, request).await,
        }
    }

    async fn get_image(&self, id: &str, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if id.is_empty() {
            return Err(ApiError::validation("missing id", "empty image id"));
        }
        let transform = self.gateway.parse_transform(&request.query)?;
        let delivery = self
            .gateway
            .deliver(id, request.header("range"), &transform)
            .await?;

        let headers = delivery
            .headers
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let body = match delivery.body {
            DeliveryBody::Stream(body) => ResponseBody::Stream(body),
            DeliveryBody::Buffered(bytes) => ResponseBody::Bytes(bytes),
        };
        Ok(ApiResponse {
            status: delivery.status,
            headers,
            body,
        })
    }
}
