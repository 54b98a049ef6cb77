//! Per-run image resolution with deduplication and bounded fetch concurrency.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    futures::future::{BoxFuture, FutureExt, Shared},
    tokio::sync::{Mutex, Semaphore},
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use skald_metrics::{counter, histogram, images as image_metrics, labels};

use crate::{
    compress::ImageCompressor,
    fetch::ImageFetcher,
    types::{ImageRef, ImageResult},
};

/// Caller-supplied mapping from an image to the `src` the renderer should use.
#[async_trait]
pub trait ResolveImageSrc: Send + Sync {
    async fn resolve_image_src(&self, image: &ImageRef) -> anyhow::Result<String>;
}

/// How images are rendered for one run.
#[derive(Clone, Default)]
pub enum ImageStrategy {
    /// Keep original URLs. Never performs I/O.
    #[default]
    Passthrough,
    /// Download and inline, optionally recompressing first.
    Embed {
        fetcher: Arc<dyn ImageFetcher>,
        compressor: Option<Arc<dyn ImageCompressor>>,
    },
    /// Ask the caller for each image's `src`.
    Custom(Arc<dyn ResolveImageSrc>),
}

impl ImageStrategy {
    #[must_use]
    pub fn embed(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self::Embed {
            fetcher,
            compressor: None,
        }
    }

    #[must_use]
    pub fn embed_compressed(
        fetcher: Arc<dyn ImageFetcher>,
        compressor: Arc<dyn ImageCompressor>,
    ) -> Self {
        Self::Embed {
            fetcher,
            compressor: Some(compressor),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Embed { .. } => "embed",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for ImageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embed { compressor, .. } => f
                .debug_struct("Embed")
                .field("compressed", &compressor.is_some())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

type PendingImage = Shared<BoxFuture<'static, ImageResult>>;

/// Resolves image references for a single transcript run.
///
/// Each distinct URL is resolved at most once; concurrent requests for the
/// same URL share one in-flight resolution. Embed fetches are limited to
/// `concurrency_limit` at a time.
pub struct ImagePipeline {
    strategy: ImageStrategy,
    permits: Arc<Semaphore>,
    cache: Mutex<HashMap<String, PendingImage>>,
    io_calls: Arc<AtomicUsize>,
}

impl ImagePipeline {
    #[must_use]
    pub fn new(strategy: ImageStrategy, concurrency_limit: usize) -> Self {
        Self {
            strategy,
            permits: Arc::new(Semaphore::new(concurrency_limit.max(1))),
            cache: Mutex::new(HashMap::new()),
            io_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn strategy(&self) -> &ImageStrategy {
        &self.strategy
    }

    /// Resolve one image. Never fails: problems become [`ImageResult::Failed`].
    pub async fn resolve(&self, image: &ImageRef) -> ImageResult {
        let pending = {
            let mut cache = self.cache.lock().await;
            match cache.get(&image.url) {
                Some(pending) => {
                    #[cfg(feature = "metrics")]
                    counter!(image_metrics::CACHE_HITS_TOTAL).increment(1);
                    pending.clone()
                },
                None => {
                    let pending = self.start(image.clone()).boxed().shared();
                    cache.insert(image.url.clone(), pending.clone());
                    pending
                },
            }
        };
        pending.await
    }

    /// Completed resolutions keyed by URL.
    pub async fn snapshot(&self) -> BTreeMap<String, ImageResult> {
        let cache = self.cache.lock().await;
        cache
            .iter()
            .filter_map(|(url, pending)| pending.peek().map(|r| (url.clone(), r.clone())))
            .collect()
    }

    /// Number of fetcher or custom resolver invocations so far.
    #[must_use]
    pub fn io_calls(&self) -> usize {
        self.io_calls.load(Ordering::Relaxed)
    }

    fn start(&self, image: ImageRef) -> impl Future<Output = ImageResult> + Send + 'static {
        let strategy = self.strategy.clone();
        let permits = Arc::clone(&self.permits);
        let io_calls = Arc::clone(&self.io_calls);

        async move {
            #[cfg(feature = "metrics")]
            let strategy_name = strategy.name();

            let result = match strategy {
                ImageStrategy::Passthrough => ImageResult::PassthroughUrl { url: image.url },
                ImageStrategy::Embed {
                    fetcher,
                    compressor,
                } => {
                    let Ok(_permit) = permits.acquire().await else {
                        return ImageResult::Failed { url: image.url };
                    };
                    io_calls.fetch_add(1, Ordering::Relaxed);
                    embed(image, fetcher.as_ref(), compressor.as_deref()).await
                },
                ImageStrategy::Custom(resolver) => {
                    io_calls.fetch_add(1, Ordering::Relaxed);
                    match resolver.resolve_image_src(&image).await {
                        Ok(src) => ImageResult::PassthroughUrl { url: src },
                        Err(e) => {
                            warn!(url = %image.url, error = %e, "custom image resolver failed");
                            ImageResult::Failed { url: image.url }
                        },
                    }
                },
            };

            #[cfg(feature = "metrics")]
            if result.is_failed() {
                counter!(image_metrics::FAILURES_TOTAL, labels::STRATEGY => strategy_name)
                    .increment(1);
            }

            result
        }
    }
}

async fn embed(
    image: ImageRef,
    fetcher: &dyn ImageFetcher,
    compressor: Option<&dyn ImageCompressor>,
) -> ImageResult {
    #[cfg(feature = "metrics")]
    let started = {
        counter!(image_metrics::FETCHES_TOTAL).increment(1);
        std::time::Instant::now()
    };

    let fetched = match fetcher.fetch(&image.url).await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(url = %image.url, error = %e, "image fetch failed");
            #[cfg(feature = "metrics")]
            {
                let error_type = e.downcast_ref::<crate::Error>().map_or("other", crate::Error::kind);
                counter!(image_metrics::FETCH_ERRORS_TOTAL, labels::ERROR_TYPE => error_type)
                    .increment(1);
            }
            return ImageResult::Failed { url: image.url };
        },
    };

    #[cfg(feature = "metrics")]
    {
        counter!(image_metrics::FETCH_BYTES_TOTAL).increment(fetched.bytes.len() as u64);
        histogram!(image_metrics::FETCH_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }

    let encoded = match compressor {
        Some(compressor) => match compressor.compress(fetched).await {
            Ok(out) => out,
            Err(e) => {
                warn!(url = %image.url, error = %e, "fetched image could not be decoded");
                return ImageResult::Failed { url: image.url };
            },
        },
        None => fetched,
    };

    debug!(
        url = %image.url,
        mime_type = %encoded.mime_type,
        bytes = encoded.bytes.len(),
        "embedded image"
    );
    ImageResult::from(encoded)
}
