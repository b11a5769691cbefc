//! Transform request parsing
//!
//! `?width=200&height=0&contrast=-15`. Absent or empty values mean "unset"
//! (0); anything else that does not parse is rejected.

use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use super::error::{ImageError, TransformParam};

/// Largest accepted contrast magnitude
pub const MAX_CONTRAST: f32 = 100.0;

/// Default ceiling on decoded source pixels (100 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Which format a transformed image is re-encoded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Always JPEG
    #[default]
    Jpeg,
    /// PNG sources stay PNG, everything else becomes JPEG
    Preserve,
}

impl OutputPolicy {
    pub fn resolve(&self, source: Option<image::ImageFormat>) -> OutputFormat {
        match (self, source) {
            (OutputPolicy::Preserve, Some(image::ImageFormat::Png)) => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }
}

impl FromStr for OutputPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputPolicy::Jpeg),
            "preserve" => Ok(OutputPolicy::Preserve),
            other => Err(format!("unknown output policy: {}", other)),
        }
    }
}

/// Upper bounds on requested dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionLimits {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for DimensionLimits {
    fn default() -> Self {
        Self {
            max_width: 4096,
            max_height: 4096,
        }
    }
}

/// Requested transformation; zero fields are unset
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformRequest {
    pub width: u32,
    pub height: u32,
    /// Signed percentage, 0 is identity
    pub contrast: f32,
}

impl TransformRequest {
    /// True when the image must be decoded and re-encoded.
    ///
    /// Only a request with no processing may forward a byte range.
    pub fn needs_processing(&self) -> bool {
        self.width > 0 || self.height > 0 || self.contrast != 0.0
    }

    pub fn needs_resize(&self) -> bool {
        self.width > 0 || self.height > 0
    }

    /// Parse from query parameters
    pub fn from_query(
        params: &HashMap<String, String>,
        limits: DimensionLimits,
    ) -> Result<Self, ImageError> {
        let width = parse_dimension(params, TransformParam::Width, limits.max_width)?;
        let height = parse_dimension(params, TransformParam::Height, limits.max_height)?;
        let contrast = parse_contrast(params)?;
        Ok(Self {
            width,
            height,
            contrast,
        })
    }
}

fn param_value<'a>(params: &'a HashMap<String, String>, param: TransformParam) -> Option<&'a str> {
    params
        .get(param.as_str())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn parse_dimension(
    params: &HashMap<String, String>,
    param: TransformParam,
    max: u32,
) -> Result<u32, ImageError> {
    let Some(raw) = param_value(params, param) else {
        return Ok(0);
    };
    let value: u32 = raw
        .parse()
        .map_err(|_| ImageError::invalid_param(param, format!("not a non-negative integer: {}", raw)))?;
    if value > max {
        return Err(ImageError::invalid_param(
            param,
            format!("{} exceeds maximum {}", value, max),
        ));
    }
    Ok(value)
}

fn parse_contrast(params: &HashMap<String, String>) -> Result<f32, ImageError> {
    let param = TransformParam::Contrast;
    let Some(raw) = param_value(params, param) else {
        return Ok(0.0);
    };
    let value: f32 = raw
        .parse()
        .map_err(|_| ImageError::invalid_param(param, format!("not a number: {}", raw)))?;
    if !value.is_finite() || value.abs() > MAX_CONTRAST {
        return Err(ImageError::invalid_param(
            param,
            format!("must be within [-{0}, {0}]", MAX_CONTRAST),
        ));
    }
    Ok(value)
}
