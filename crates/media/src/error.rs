use std::error::Error as StdError;

use skald_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
    #[error("{context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: image::ImageError,
    },
    #[error("{0}")]
    Message(String),
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn decode(context: impl Into<String>, source: image::ImageError) -> Self {
        Self::Decode {
            context: context.into(),
            source,
        }
    }

    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Short label for the `error_type` metric label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Status { .. } => "status",
            Self::TooLarge { .. } => "too_large",
            Self::Decode { .. } => "decode",
            Self::Message(_) => "message",
            Self::External { .. } => "external",
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

skald_common::impl_context!();
