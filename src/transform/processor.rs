//! Image processing implementation
//!
//! decode → resize → contrast → encode, entirely in memory. The decoded
//! image is fully materialised, so peak memory scales with the source
//! object's pixel count.

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::ImageError;
use super::params::{
    DimensionLimits, OutputFormat, OutputPolicy, TransformRequest, DEFAULT_MAX_SOURCE_PIXELS,
};

/// Limits and encoding choices applied to every transformed image
#[derive(Debug, Clone, Copy)]
pub struct TransformOptions {
    pub policy: OutputPolicy,
    pub quality: EncoderQuality,
    /// Output dimensions never exceed these, derived ones included
    pub limits: DimensionLimits,
    /// Sources with more pixels are refused before decoding
    pub max_source_pixels: u64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            policy: OutputPolicy::default(),
            quality: EncoderQuality::default(),
            limits: DimensionLimits::default(),
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }
}

/// Result of image processing
#[derive(Debug)]
pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    /// Content-Type header value
    pub content_type: &'static str,
    /// Original dimensions (width, height)
    pub source_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

/// Apply `request` to an encoded image
pub fn process_image(
    data: &[u8],
    request: &TransformRequest,
    options: &TransformOptions,
) -> Result<ProcessedImage, ImageError> {
    let (src_w, src_h) = source_dimensions(data)?;
    validate_dimensions(src_w, src_h, options.max_source_pixels)?;

    let (mut img, source_format) = decode_image(data)?;
    let source_size = img.dimensions();

    if request.needs_resize() {
        let (target_w, target_h) = target_dimensions(
            source_size.0,
            source_size.1,
            request.width,
            request.height,
            options.limits,
        );
        if (target_w, target_h) != source_size {
            img = resize_image(&img, target_w, target_h)?;
        }
    }

    if request.contrast != 0.0 {
        adjust_contrast(&mut img, request.contrast);
    }

    let format = options.policy.resolve(source_format);
    let (width, height) = img.dimensions();
    let encoded = EncoderFactory::create(format).encode(img.as_raw(), width, height, options.quality)?;

    Ok(ProcessedImage {
        data: encoded.data,
        format: encoded.format,
        content_type: encoded.content_type,
        source_size,
        output_size: (width, height),
    })
}

/// Read the declared dimensions from the image header without decoding
pub fn source_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Validate source dimensions against the pixel ceiling.
///
/// Called before decoding so a small file that inflates to a huge bitmap
/// is refused instead of allocated.
pub fn validate_dimensions(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(ImageError::ImageBombDetected {
            width,
            height,
            pixels,
            max_pixels,
        });
    }
    Ok(())
}

/// Decode image data, detecting the container from its magic bytes
pub fn decode_image(data: &[u8]) -> Result<(RgbaImage, Option<ImageFormat>), ImageError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    let format = reader.format();
    let img = reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    Ok((img.to_rgba8(), format))
}

/// Output dimensions for a resize request.
///
/// Both set: exact target. One set: the other follows the source aspect
/// ratio (rounded, at least 1). Neither set: unchanged. A result larger
/// than `limits` is scaled down as a whole, keeping its aspect ratio.
pub fn target_dimensions(
    src_w: u32,
    src_h: u32,
    width: u32,
    height: u32,
    limits: DimensionLimits,
) -> (u32, u32) {
    let scaled = |value: u32, numerator: u32, denominator: u32| -> u64 {
        if denominator == 0 {
            return 1;
        }
        let v = (value as f64 * numerator as f64 / denominator as f64).round();
        (v.min(u32::MAX as f64) as u64).max(1)
    };

    let (w, h) = match (width, height) {
        (0, 0) => return (src_w, src_h),
        (w, 0) => (u64::from(w), scaled(src_h, w, src_w)),
        (0, h) => (scaled(src_w, h, src_h), u64::from(h)),
        (w, h) => (u64::from(w), u64::from(h)),
    };

    let max_w = u64::from(limits.max_width.max(1));
    let max_h = u64::from(limits.max_height.max(1));
    if w <= max_w && h <= max_h {
        return (w as u32, h as u32);
    }

    let factor = (max_w as f64 / w as f64).min(max_h as f64 / h as f64);
    let fit = |value: u64, max: u64| -> u32 {
        ((value as f64 * factor).round() as u64).clamp(1, max) as u32
    };
    (fit(w, max_w), fit(h, max_h))
}

/// Resize using fast-image-resize with the Lanczos3 filter
pub fn resize_image(img: &RgbaImage, target_w: u32, target_h: u32) -> Result<RgbaImage, ImageError> {
    let src_width =
        NonZeroU32::new(img.width()).ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height =
        NonZeroU32::new(img.height()).ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(src_width, src_height, img.as_raw().clone(), PixelType::U8x4)
        .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3))
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))
}

/// Linear contrast stretch around mid-gray.
///
/// `factor = 1 + amount / 100`; colour channels only, alpha is kept.
/// An amount of exactly 0 leaves the buffer untouched.
pub fn adjust_contrast(img: &mut RgbaImage, amount: f32) {
    if amount == 0.0 {
        return;
    }
    let lut = contrast_lut(amount);
    img.par_chunks_mut(4).for_each(|px| {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    });
}

fn contrast_lut(amount: f32) -> [u8; 256] {
    let factor = 1.0 + amount / 100.0;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        let x = v as f32 / 255.0;
        let y = ((x - 0.5) * factor + 0.5).clamp(0.0, 1.0);
        *slot = (y * 255.0).round() as u8;
    }
    lut
}
