//! Config schema types.

use serde::{Deserialize, Serialize};

/// Root configuration (`skald.toml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkaldConfig {
    pub transcript: TranscriptConfig,
    pub images: ImagesConfig,
}

/// How image references are rendered into the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStrategyKind {
    /// Keep original URLs; no network access.
    #[default]
    Passthrough,
    /// Fetch and inline as data URIs.
    Embed,
    /// Delegate to a resolver supplied at runtime.
    Custom,
}

impl ImageStrategyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Embed => "embed",
            Self::Custom => "custom",
        }
    }
}

/// Markup dialect used for a class of content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentParseMode {
    #[default]
    Normal,
    Extended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    pub image_strategy: ImageStrategyKind,
    /// Dialect for content written by users.
    pub message_parse_mode: ContentParseMode,
    /// Dialect for content posted through webhooks.
    pub webhook_parse_mode: ContentParseMode,
    /// Dialect for embed titles, descriptions and fields.
    pub embed_parse_mode: ContentParseMode,
    /// Emoji-only messages with at most this many emoji render large.
    pub emoji_large_threshold: usize,
    /// Maximum concurrent image fetches.
    pub concurrency_limit: usize,
    /// IANA zone used for timestamp labels.
    pub timezone: String,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            image_strategy: ImageStrategyKind::Passthrough,
            message_parse_mode: ContentParseMode::Normal,
            webhook_parse_mode: ContentParseMode::Extended,
            embed_parse_mode: ContentParseMode::Extended,
            emoji_large_threshold: 25,
            concurrency_limit: 4,
            timezone: "UTC".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub fetch_timeout_secs: u64,
    pub max_fetch_bytes: u64,
    pub user_agent: String,
    /// Present to enable lossy re-encoding of fetched images.
    pub compression: Option<CompressionConfig>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 15,
            max_fetch_bytes: 8 * 1024 * 1024,
            user_agent: concat!("skald/", env!("CARGO_PKG_VERSION")).into(),
            compression: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Longest edge after resizing, in pixels.
    pub max_dimension: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            max_dimension: 1600,
        }
    }
}
