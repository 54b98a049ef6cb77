//! Shrinking fetched images before they are inlined.

use {async_trait::async_trait, bytes::Bytes, tracing::debug};

#[cfg(feature = "metrics")]
use skald_metrics::{counter, images as image_metrics};

use crate::{error::Context as _, image_ops, types::EncodedImage};

/// Transforms fetched image bytes.
#[async_trait]
pub trait ImageCompressor: Send + Sync {
    async fn compress(&self, image: EncodedImage) -> anyhow::Result<EncodedImage>;
}

/// Resizes to a maximum edge and re-encodes lossy, keeping PNG for images
/// with transparency and leaving GIFs alone.
#[derive(Debug, Clone, Copy)]
pub struct LossyCompressor {
    quality: u8,
    max_dimension: u32,
}

impl LossyCompressor {
    #[must_use]
    pub fn new(quality: u8, max_dimension: u32) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            max_dimension: max_dimension.max(1),
        }
    }
}

impl Default for LossyCompressor {
    fn default() -> Self {
        Self::new(80, 1600)
    }
}

#[async_trait]
impl ImageCompressor for LossyCompressor {
    async fn compress(&self, image: EncodedImage) -> anyhow::Result<EncodedImage> {
        let Self {
            quality,
            max_dimension,
        } = *self;
        let input = image.bytes.clone();
        let out = tokio::task::spawn_blocking(move || {
            image_ops::compress(&input, quality, max_dimension)
        })
        .await
        .context("compression task failed")??;

        if !out.was_reencoded {
            return Ok(image);
        }

        #[cfg(feature = "metrics")]
        counter!(image_metrics::COMPRESSIONS_TOTAL).increment(1);

        debug!(
            from_bytes = image.bytes.len(),
            to_bytes = out.data.len(),
            resized = out.was_resized,
            media_type = out.media_type,
            "recompressed image"
        );
        Ok(EncodedImage {
            bytes: Bytes::from(out.data),
            mime_type: out.media_type.to_string(),
        })
    }
}
