// Error types module

use thiserror::Error;

/// Centralized error type for the HTTP surface
///
/// Every collaborator failure is mapped into one of these categories at the
/// handler boundary. The `Display` output carries the internal detail and is
/// only ever logged; clients see [`ApiError::client_message`].
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Missing or malformed request input
    #[error("validation error: {message}")]
    Validation {
        message: &'static str,
        detail: String,
    },

    /// Missing record or object
    #[error("not found: {message}")]
    NotFound { message: &'static str },

    /// Store call failed (detail logged, never exposed)
    #[error("upstream error: {detail}")]
    Upstream {
        message: &'static str,
        detail: String,
    },

    /// Source image could not be decoded or transformed
    #[error("decode error: {0}")]
    Decode(String),

    /// Transformed image could not be encoded
    #[error("encode error: {0}")]
    Encode(String),

    /// Malformed pagination cursor
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Known path, unsupported method
    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn validation(message: &'static str, detail: impl Into<String>) -> Self {
        ApiError::Validation {
            message,
            detail: detail.into(),
        }
    }

    pub fn not_found(message: &'static str) -> Self {
        ApiError::NotFound { message }
    }

    pub fn upstream(message: &'static str, detail: impl Into<String>) -> Self {
        ApiError::Upstream {
            message,
            detail: detail.into(),
        }
    }

    /// Maps API errors to HTTP status codes
    ///
    /// - Validation, InvalidToken → 400
    /// - NotFound → 404
    /// - MethodNotAllowed → 405
    /// - Upstream, Decode, Encode → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidToken(_) => 400,
            ApiError::NotFound { .. } => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Upstream { .. } | ApiError::Decode(_) | ApiError::Encode(_) => 500,
        }
    }

    /// Generic message safe to hand to a client
    pub fn client_message(&self) -> &'static str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::NotFound { message } => message,
            ApiError::Upstream { message, .. } => message,
            ApiError::Decode(_) | ApiError::Encode(_) => "failed to process image",
            ApiError::InvalidToken(_) => "invalid pagination token",
            ApiError::MethodNotAllowed => "method not allowed",
        }
    }

    /// JSON body sent to the client: `{"error":"<message>"}`
    pub fn to_json_body(&self) -> String {
        serde_json::json!({ "error": self.client_message() }).to_string()
    }
}
