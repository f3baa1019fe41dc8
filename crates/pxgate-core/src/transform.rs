//! Transform dispatch: passthrough detection, dimension clamping,
//! scaling, and re-encoding via the `image` engine.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use pxgate_common::{ImageType, OutputFormat, ProxyError, Result, ScalingMode, TransformOptions};
use tracing::debug;

/// Hard per-axis ceiling on requested dimensions, bounding processing
/// cost regardless of client-supplied values.
pub const MAX_DIMENSION: u32 = 8000;

const JPEG_QUALITY: u8 = 85;

pub fn clamp_dimension(requested: u32) -> u32 {
    requested.min(MAX_DIMENSION)
}

/// Animated GIFs requested at native size are served unchanged: pushing
/// them through the engine collapses them to a single still frame.
pub fn is_passthrough(source: ImageType, opts: &TransformOptions) -> bool {
    source == ImageType::Gif
        && opts.width.unwrap_or(0) == 0
        && opts.height.unwrap_or(0) == 0
        && opts.mode == ScalingMode::Fit
        && opts.format == OutputFormat::Match
}

/// Decodes, scales, and re-encodes `bytes` per `opts`. Returns the
/// produced bytes together with their output type.
pub fn transform(
    bytes: &[u8],
    source: ImageType,
    opts: &TransformOptions,
) -> Result<(Vec<u8>, ImageType)> {
    let img = image::load_from_memory(bytes).map_err(|_| ProxyError::InvalidImage)?;
    let (iw, ih) = (img.width(), img.height());
    if iw == 0 || ih == 0 {
        return Err(ProxyError::InvalidImage);
    }

    let width = opts.width.map(clamp_dimension).filter(|w| *w > 0);
    let height = opts.height.map(clamp_dimension).filter(|h| *h > 0);

    let scaled = match (width, height) {
        (None, None) => img,
        // One axis constrained: both modes degrade to an aspect-
        // preserving scale to that axis, nothing to crop.
        (Some(w), None) => {
            let h = scaled_axis(ih, iw, w);
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        (None, Some(h)) => {
            let w = scaled_axis(iw, ih, h);
            img.resize_exact(w, h, FilterType::Lanczos3)
        }
        (Some(w), Some(h)) => match opts.mode {
            ScalingMode::Cover => img.resize_to_fill(w, h, FilterType::Lanczos3),
            ScalingMode::Fit => img.resize(w, h, FilterType::Lanczos3),
        },
    };

    let target = match opts.format {
        OutputFormat::Match => source,
        OutputFormat::Jpeg => ImageType::Jpeg,
        OutputFormat::Png => ImageType::Png,
        OutputFormat::Webp => ImageType::Webp,
    };

    debug!(
        from = ?source,
        to = ?target,
        width = scaled.width(),
        height = scaled.height(),
        "transformed image"
    );
    Ok((encode(&scaled, target)?, target))
}

fn scaled_axis(axis: u32, other: u32, other_target: u32) -> u32 {
    let scaled = (axis as f64 * other_target as f64 / other as f64).round() as u32;
    scaled.max(1)
}

/// Fixed encoder parameters keep output deterministic and comparable
/// across requests for the same key.
fn encode(img: &DynamicImage, target: ImageType) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    match target {
        ImageType::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
            // JPEG has no alpha channel
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        ImageType::Png => {
            let encoder = png::PngEncoder::new_with_quality(
                &mut cursor,
                png::CompressionType::Best,
                png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)
        }
        ImageType::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut cursor);
            DynamicImage::ImageRgba8(img.to_rgba8()).write_with_encoder(encoder)
        }
        ImageType::Gif => img.write_to(&mut cursor, ImageFormat::Gif),
    }
    .map_err(|_| ProxyError::InvalidImage)?;
    Ok(buf)
}
