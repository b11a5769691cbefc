//! Image transform error types

use std::fmt;

/// Query parameter of a transform request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformParam {
    Width,
    Height,
    Contrast,
}

impl TransformParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Contrast => "contrast",
        }
    }

    /// Public message used when this parameter is rejected
    pub fn invalid_message(&self) -> &'static str {
        match self {
            Self::Width => "invalid width",
            Self::Height => "invalid height",
            Self::Contrast => "invalid contrast",
        }
    }
}

/// Errors that can occur while transforming an image
#[derive(Debug, Clone)]
pub enum ImageError {
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// Source declares more pixels than the decoder is allowed to allocate
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },
    /// Invalid transformation parameter
    InvalidParameter {
        param: TransformParam,
        message: String,
    },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::ImageBombDetected {
                width,
                height,
                pixels,
                max_pixels,
            } => write!(
                f,
                "Source image {}x{} ({} pixels) exceeds limit of {} pixels",
                width, height, pixels, max_pixels
            ),
            ImageError::InvalidParameter { param, message } => {
                write!(f, "Invalid parameter '{}': {}", param.as_str(), message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(param: TransformParam, message: impl Into<String>) -> Self {
        ImageError::InvalidParameter {
            param,
            message: message.into(),
        }
    }
}
