//! Proxy utility functions.
//!
//! Conversions between Pingora request headers and the transport-agnostic
//! [`ApiRequest`].

use std::collections::HashMap;

use pingora_http::RequestHeader;

use crate::api::{parse_query_string, ApiRequest};

/// Extract headers from Pingora RequestHeader into HashMap.
///
/// Names are lowercase. Headers with non-UTF8 values are skipped.
pub fn extract_headers(req: &RequestHeader) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (name, value) in req.headers.iter() {
        if let Ok(value_str) = value.to_str() {
            headers.insert(name.as_str().to_ascii_lowercase(), value_str.to_string());
        }
    }
    headers
}

/// Extract query parameters from URI. Values are URL-decoded.
pub fn extract_query_params(req: &RequestHeader) -> HashMap<String, String> {
    req.uri
        .query()
        .map(parse_query_string)
        .unwrap_or_default()
}

/// Build an [`ApiRequest`] from the request header
pub fn to_api_request(req: &RequestHeader) -> ApiRequest {
    ApiRequest {
        method: req.method.as_str().to_string(),
        path: req.uri.path().to_string(),
        query: extract_query_params(req),
        headers: extract_headers(req),
    }
}
