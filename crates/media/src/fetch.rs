//! Downloading image bytes.

use std::time::Duration;

use {
    async_trait::async_trait,
    bytes::{Bytes, BytesMut},
    reqwest::{Client, header::CONTENT_TYPE},
    tracing::debug,
};

use crate::{
    error::{Error, OptionContext as _, Result},
    image_ops,
    types::EncodedImage,
};

/// Loads the bytes behind an image URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<EncodedImage>;
}

/// [`ImageFetcher`] backed by `reqwest`, with a timeout, a body size cap and
/// a content-type check.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::external("failed to build http client", e))?;
        Ok(Self::with_client(client, max_bytes))
    }

    #[must_use]
    pub fn with_client(client: Client, max_bytes: u64) -> Self {
        Self { client, max_bytes }
    }

    async fn download(&self, url: &str) -> Result<EncodedImage> {
        let http_err = |source| Error::Http {
            url: url.to_string(),
            source,
        };

        debug!(url, "fetching image");
        let mut resp = self.client.get(url).send().await.map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let too_large = || Error::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        let declared = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty() && v != "application/octet-stream");
        if let Some(ct) = &declared
            && !ct.starts_with("image/")
        {
            return Err(Error::message(format!("{url} is not an image ({ct})")));
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(http_err)? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let bytes: Bytes = body.freeze();

        let mime_type = match declared {
            Some(ct) => ct,
            None => image_ops::sniff_media_type(&bytes)
                .with_context(|| format!("{url} did not return a recognizable image"))?
                .to_string(),
        };

        debug!(url, bytes = bytes.len(), mime_type = %mime_type, "fetched image");
        Ok(EncodedImage { bytes, mime_type })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<EncodedImage> {
        Ok(self.download(url).await?)
    }
}
