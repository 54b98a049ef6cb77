//! Image processing operations for embedded transcript media.
//!
//! Sniffs formats, resizes oversized images and re-encodes them so inlined
//! data URIs stay small. Animated formats are never touched.

use std::io::Cursor;

use image::{
    DynamicImage, GenericImageView, ImageFormat, ImageReader, codecs::webp::WebPDecoder,
};

use crate::error::{Error, Result};

/// Image metadata.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

/// Result of recompression.
#[derive(Debug)]
pub struct CompressedImage {
    /// The encoded image data.
    pub data: Vec<u8>,
    /// MIME type of the output image.
    pub media_type: &'static str,
    /// Original dimensions.
    pub original_width: u32,
    pub original_height: u32,
    /// Final dimensions after resizing.
    pub final_width: u32,
    pub final_height: u32,
    /// Whether the image was resized.
    pub was_resized: bool,
    /// Whether `data` differs from the input bytes.
    pub was_reencoded: bool,
}

impl CompressedImage {
    fn unchanged(data: &[u8], media_type: &'static str, width: u32, height: u32) -> Self {
        Self {
            data: data.to_vec(),
            media_type,
            original_width: width,
            original_height: height,
            final_width: width,
            final_height: height,
            was_resized: false,
            was_reencoded: false,
        }
    }
}

/// Guess the image format from magic bytes.
#[must_use]
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data).ok()
}

/// MIME type for sniffed image bytes, if they look like a known image.
#[must_use]
pub fn sniff_media_type(data: &[u8]) -> Option<&'static str> {
    sniff_format(data).map(|f| format_to_media_type(Some(f)))
}

/// Get metadata about an image without fully decoding it.
pub fn get_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::external("failed to guess image format", e))?;

    let format = reader.format();
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| Error::decode("failed to read image dimensions", e))?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Shrink an image to fit `max_dimension` and re-encode it.
///
/// - GIFs and animated WebPs are returned unchanged;
/// - images with an alpha channel are encoded as PNG;
/// - everything else becomes JPEG at `quality`.
///
/// If re-encoding a non-resized image would make it larger, the original
/// bytes are kept.
pub fn compress(data: &[u8], quality: u8, max_dimension: u32) -> Result<CompressedImage> {
    let format = sniff_format(data);
    if format == Some(ImageFormat::Gif) || is_animated_webp(format, data) {
        let (width, height) = get_image_metadata(data).map_or((0, 0), |m| (m.width, m.height));
        return Ok(CompressedImage::unchanged(
            data,
            format_to_media_type(format),
            width,
            height,
        ));
    }

    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::external("failed to guess image format", e))?
        .decode()
        .map_err(|e| Error::decode("failed to decode image", e))?;

    let (orig_width, orig_height) = img.dimensions();
    let (final_width, final_height, resized) = resize_to_fit(&img, max_dimension);
    let was_resized = (final_width, final_height) != (orig_width, orig_height);

    let (output, media_type) = if img.color().has_alpha() {
        encode_png(&resized)?
    } else {
        encode_jpeg_with_quality(&resized, quality)?
    };

    if !was_resized && output.len() >= data.len() {
        return Ok(CompressedImage::unchanged(
            data,
            format_to_media_type(format),
            orig_width,
            orig_height,
        ));
    }

    Ok(CompressedImage {
        data: output,
        media_type,
        original_width: orig_width,
        original_height: orig_height,
        final_width,
        final_height,
        was_resized,
        was_reencoded: true,
    })
}

fn is_animated_webp(format: Option<ImageFormat>, data: &[u8]) -> bool {
    format == Some(ImageFormat::WebP)
        && WebPDecoder::new(Cursor::new(data)).is_ok_and(|d| d.has_animation())
}

/// Resize image to fit within max dimension, preserving aspect ratio.
fn resize_to_fit(img: &DynamicImage, max_dimension: u32) -> (u32, u32, DynamicImage) {
    let (width, height) = img.dimensions();

    if width <= max_dimension && height <= max_dimension {
        return (width, height, img.clone());
    }

    let resized = img.resize(
        max_dimension,
        max_dimension,
        image::imageops::FilterType::Lanczos3,
    );
    let (new_width, new_height) = resized.dimensions();
    (new_width, new_height, resized)
}

/// Encode image as JPEG with specified quality.
fn encode_jpeg_with_quality(img: &DynamicImage, quality: u8) -> Result<(Vec<u8>, &'static str)> {
    let mut output = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    // JPEG has no alpha or 16-bit channels
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| Error::decode("failed to encode as JPEG", e))?;
    Ok((output.into_inner(), "image/jpeg"))
}

fn encode_png(img: &DynamicImage) -> Result<(Vec<u8>, &'static str)> {
    let mut output = Cursor::new(Vec::new());
    img.write_to(&mut output, ImageFormat::Png)
        .map_err(|e| Error::decode("failed to encode as PNG", e))?;
    Ok((output.into_inner(), "image/png"))
}

/// Convert ImageFormat to MIME type string.
#[must_use]
pub fn format_to_media_type(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::WebP) => "image/webp",
        Some(ImageFormat::Gif) => "image/gif",
        _ => "application/octet-stream",
    }
}
