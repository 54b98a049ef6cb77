//! Immutable per-run settings and collaborators.

use std::{sync::Arc, time::Duration};

use {
    chrono::{DateTime, Utc},
    chrono_tz::Tz,
    serde::{Deserialize, Serialize},
    skald_common::types::Snowflake,
    skald_config::{ContentParseMode, ImageStrategyKind, SkaldConfig, validate_config},
    skald_markdown::{DEFAULT_LARGE_EMOJI_THRESHOLD, ParseMode, ParseOptions},
    skald_media::{HttpFetcher, ImageStrategy, LossyCompressor, ResolveImageSrc},
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    resolver::{ResolveChannel, ResolveRole, ResolveUser, Resolvers},
};

/// Header data for the exported channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_name: Option<String>,
}

/// Markup dialect for each content origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePolicy {
    pub message: ParseMode,
    pub webhook: ParseMode,
    pub embed: ParseMode,
    pub large_emoji_threshold: usize,
}

impl Default for ParsePolicy {
    fn default() -> Self {
        Self {
            message: ParseMode::Normal,
            webhook: ParseMode::Extended,
            embed: ParseMode::Extended,
            large_emoji_threshold: DEFAULT_LARGE_EMOJI_THRESHOLD,
        }
    }
}

impl ParsePolicy {
    pub(crate) fn for_message(&self, webhook: bool) -> ParseOptions {
        ParseOptions {
            mode: if webhook {
                self.webhook
            } else {
                self.message
            },
            large_emoji_threshold: self.large_emoji_threshold,
        }
    }

    pub(crate) fn for_embed(&self) -> ParseOptions {
        ParseOptions {
            mode: self.embed,
            large_emoji_threshold: self.large_emoji_threshold,
        }
    }
}

fn parse_mode(mode: ContentParseMode) -> ParseMode {
    match mode {
        ContentParseMode::Normal => ParseMode::Normal,
        ContentParseMode::Extended => ParseMode::Extended,
    }
}

/// Everything an assemble run needs besides the messages.
///
/// Values are never mutated in place; the `with_*` builders return a new
/// context, so one base context can be shared by concurrent runs.
#[derive(Debug, Clone)]
pub struct RenderContext {
    resolvers: Resolvers,
    image_strategy: ImageStrategy,
    parse: ParsePolicy,
    concurrency_limit: usize,
    timezone: Tz,
    reference_time: Option<DateTime<Utc>>,
    cancel: CancellationToken,
    channel: Option<ChannelHeader>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            resolvers: Resolvers::default(),
            image_strategy: ImageStrategy::Passthrough,
            parse: ParsePolicy::default(),
            concurrency_limit: 4,
            timezone: Tz::UTC,
            reference_time: None,
            cancel: CancellationToken::new(),
            channel: None,
        }
    }
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from loaded configuration.
    ///
    /// `image_resolver` is required when the config selects the custom
    /// image strategy and ignored otherwise.
    pub fn from_config(
        config: &SkaldConfig,
        image_resolver: Option<Arc<dyn ResolveImageSrc>>,
    ) -> Result<Self> {
        let validation = validate_config(config);
        if validation.has_errors() {
            return Err(Error::config(validation.error_summary()));
        }

        let transcript = &config.transcript;
        let images = &config.images;

        let image_strategy = match (transcript.image_strategy, image_resolver) {
            (ImageStrategyKind::Passthrough, _) => ImageStrategy::Passthrough,
            (ImageStrategyKind::Embed, _) => {
                let fetcher = HttpFetcher::new(
                    Duration::from_secs(images.fetch_timeout_secs),
                    images.max_fetch_bytes,
                    &images.user_agent,
                )
                .map_err(|e| Error::config(e.to_string()))?;
                match images.compression {
                    Some(c) => ImageStrategy::embed_compressed(
                        Arc::new(fetcher),
                        Arc::new(LossyCompressor::new(c.quality, c.max_dimension)),
                    ),
                    None => ImageStrategy::embed(Arc::new(fetcher)),
                }
            },
            (ImageStrategyKind::Custom, Some(resolver)) => ImageStrategy::Custom(resolver),
            (ImageStrategyKind::Custom, None) => {
                return Err(Error::config(
                    "image_strategy \"custom\" requires an image resolver",
                ));
            },
        };

        let timezone: Tz = transcript
            .timezone
            .parse()
            .map_err(|_| Error::config(format!("unknown timezone \"{}\"", transcript.timezone)))?;

        debug!(
            strategy = image_strategy.name(),
            concurrency = transcript.concurrency_limit,
            timezone = %timezone,
            "render context from config"
        );

        Ok(Self {
            image_strategy,
            parse: ParsePolicy {
                message: parse_mode(transcript.message_parse_mode),
                webhook: parse_mode(transcript.webhook_parse_mode),
                embed: parse_mode(transcript.embed_parse_mode),
                large_emoji_threshold: transcript.emoji_large_threshold,
            },
            concurrency_limit: transcript.concurrency_limit,
            timezone,
            ..Self::default()
        })
    }

    // ── Builders ────────────────────────────────────────────────────────────

    #[must_use]
    pub fn with_resolvers(mut self, resolvers: Resolvers) -> Self {
        self.resolvers = resolvers;
        self
    }

    #[must_use]
    pub fn with_user_resolver(mut self, resolver: Arc<dyn ResolveUser>) -> Self {
        self.resolvers.user = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_role_resolver(mut self, resolver: Arc<dyn ResolveRole>) -> Self {
        self.resolvers.role = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_channel_resolver(mut self, resolver: Arc<dyn ResolveChannel>) -> Self {
        self.resolvers.channel = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_image_strategy(mut self, strategy: ImageStrategy) -> Self {
        self.image_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse = policy;
        self
    }

    #[must_use]
    pub fn with_large_emoji_threshold(mut self, threshold: usize) -> Self {
        self.parse.large_emoji_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// "Now" for relative timestamp labels, also recorded as the
    /// document's `generated_at`.
    #[must_use]
    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = Some(at);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: ChannelHeader) -> Self {
        self.channel = Some(channel);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn resolvers(&self) -> &Resolvers {
        &self.resolvers
    }

    #[must_use]
    pub fn image_strategy(&self) -> &ImageStrategy {
        &self.image_strategy
    }

    #[must_use]
    pub fn parse_policy(&self) -> &ParsePolicy {
        &self.parse
    }

    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// `None` unless set; relative labels and `generated_at` are then omitted.
    #[must_use]
    pub fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn channel(&self) -> Option<&ChannelHeader> {
        self.channel.as_ref()
    }
}
