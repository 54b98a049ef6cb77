use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    bytes::Bytes,
    serde::{Deserialize, Serialize},
};

/// An image referenced by a transcript. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    /// Declared MIME type, when the source supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub is_emoji: bool,
}

impl ImageRef {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
            is_emoji: false,
        }
    }

    #[must_use]
    pub fn emoji(url: impl Into<String>) -> Self {
        Self {
            is_emoji: true,
            ..Self::new(url)
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }
}

/// Image bytes together with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

/// How an image appears in the finished document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageResult {
    /// Original or caller-supplied URL, used as is.
    PassthroughUrl { url: String },
    /// Inlined bytes; serialized as base64.
    InlineData {
        mime_type: String,
        #[serde(with = "base64_bytes")]
        data: Bytes,
    },
    /// Resolution failed; the renderer falls back to the original URL.
    Failed { url: String },
}

impl ImageResult {
    /// Value for an `src` attribute: a URL or a `data:` URI.
    #[must_use]
    pub fn src(&self) -> String {
        match self {
            Self::PassthroughUrl { url } | Self::Failed { url } => url.clone(),
            Self::InlineData { mime_type, data } => {
                format!("data:{mime_type};base64,{}", STANDARD.encode(data))
            },
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<EncodedImage> for ImageResult {
    fn from(image: EncodedImage) -> Self {
        Self::InlineData {
            mime_type: image.mime_type,
            data: image.bytes,
        }
    }
}

mod base64_bytes {
    use {
        base64::{Engine as _, engine::general_purpose::STANDARD},
        bytes::Bytes,
        serde::{Deserialize, Deserializer, Serializer},
    };

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
