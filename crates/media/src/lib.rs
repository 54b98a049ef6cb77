//! Image pipeline: fetch, sniff, recompress and inline images referenced by a transcript.

pub mod compress;
pub mod error;
pub mod fetch;
pub mod image_ops;
pub mod pipeline;
pub mod types;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod fixtures;

pub use {
    compress::{ImageCompressor, LossyCompressor},
    error::{Error, Result},
    fetch::{HttpFetcher, ImageFetcher},
    pipeline::{ImagePipeline, ImageStrategy, ResolveImageSrc},
    types::{EncodedImage, ImageRef, ImageResult},
};
