//! Image transform engine
//!
//! Decodes a raster image (JPEG, PNG, GIF, WebP), optionally resizes it
//! and adjusts contrast, then re-encodes it according to the configured
//! output policy.
//!
//! ```text
//! /image/abc?width=320&contrast=15
//! ```
//!
//! All functions are pure; callers run them on the blocking pool.

pub mod encoder;
pub mod error;
pub mod params;
pub mod processor;

pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder, DEFAULT_JPEG_QUALITY};
pub use error::{ImageError, TransformParam};
pub use params::{
    DimensionLimits, OutputFormat, OutputPolicy, TransformRequest, DEFAULT_MAX_SOURCE_PIXELS,
};
pub use processor::{
    adjust_contrast, decode_image, process_image, resize_image, source_dimensions,
    target_dimensions, validate_dimensions, ProcessedImage, TransformOptions,
};
