//! Turns an ordered message list into a [`Document`].
//!
//! Parsing and registration run sequentially in input order. All entity and
//! image resolutions are then awaited together inside this future, so a slow
//! lookup never blocks the parsing of later messages.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use {
    chrono::{DateTime, Duration, Utc},
    chrono_tz::Tz,
    futures::future::{join, join_all},
    skald_common::types::{Embed, Message, Snowflake},
    skald_markdown::{
        EntityKind, MarkupNode, TimestampStyle,
        ast::{collect_custom_emoji, collect_mentions, collect_timestamps},
        emoji::custom_emoji_url,
        parse_message, plain_text_with,
    },
    skald_media::{ImagePipeline, ImageRef},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use skald_metrics::{counter, histogram, transcript as transcript_metrics};

use crate::{
    context::RenderContext,
    document::{
        AttachmentFragment, Document, EmbedAuthorFragment, EmbedFieldFragment, EmbedFooterFragment,
        EmbedFragment, MessageFragment, ReactionFragment, ReplyPreview, timestamp_key,
    },
    error::{Error, Result},
    profile::{ProfileData, ProfileRegistry},
    resolver::{EntityKey, EntityResolver, ResolvedEntity},
};

/// Longest reply excerpt, in characters.
const REPLY_EXCERPT_CHARS: usize = 100;

/// Consecutive messages by one author closer than this share a group.
const GROUP_WINDOW_MINUTES: i64 = 7;

/// Assemble `messages` into a document.
///
/// Fails only for structurally invalid input or cancellation; lookup and
/// image failures degrade to sentinel values inside the document.
pub async fn assemble(messages: &[Message], ctx: &RenderContext) -> Result<Document> {
    #[cfg(feature = "metrics")]
    let started = std::time::Instant::now();
    #[cfg(feature = "metrics")]
    counter!(transcript_metrics::RUNS_TOTAL).increment(1);

    info!(
        messages = messages.len(),
        strategy = ctx.image_strategy().name(),
        "assembling transcript"
    );

    if let Err(e) = validate(messages) {
        warn!(error = %e, "rejecting transcript input");
        #[cfg(feature = "metrics")]
        counter!(transcript_metrics::INVALID_INPUT_TOTAL).increment(1);
        return Err(e);
    }
    if ctx.cancellation().is_cancelled() {
        return Err(cancelled());
    }

    // ── Parse and collect ───────────────────────────────────────────────────

    let mut collected = Collected::default();
    let parsed: Vec<ParsedEntry> = messages
        .iter()
        .map(|message| collected.ingest(message, ctx))
        .collect();
    debug!(
        profiles = collected.profiles.len(),
        entities = collected.entities.len(),
        images = collected.images.len(),
        "parsed messages"
    );

    // ── Resolve ─────────────────────────────────────────────────────────────

    let resolver = EntityResolver::new(ctx.resolvers().clone());
    let pipeline = ImagePipeline::new(ctx.image_strategy().clone(), ctx.concurrency_limit());

    let entity_work = join_all(collected.entities.iter().map(|key| resolver.resolve(*key)));
    let image_work = join_all(collected.images.values().map(|image| pipeline.resolve(image)));

    tokio::select! {
        biased;
        () = ctx.cancellation().cancelled() => return Err(cancelled()),
        _ = join(entity_work, image_work) => {},
    }

    let entities = resolver.snapshot().await;
    let images = pipeline.snapshot().await;
    debug!(
        lookups = resolver.lookups(),
        image_io = pipeline.io_calls(),
        failed_images = images.values().filter(|r| r.is_failed()).count(),
        "resolved references"
    );

    // ── Emit ────────────────────────────────────────────────────────────────

    let tz = ctx.timezone();
    let reference_time = ctx.reference_time();
    let timestamps: BTreeMap<String, String> = collected
        .timestamps
        .iter()
        .filter_map(|&(epoch, style)| {
            style
                .format(epoch, tz, reference_time)
                .map(|label| (timestamp_key(epoch, style), label))
        })
        .collect();

    let by_id: HashMap<Snowflake, usize> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| (m.id, i))
        .collect();
    let replies: Vec<Option<ReplyPreview>> = messages
        .iter()
        .map(|m| {
            m.reference
                .as_ref()
                .map(|r| reply_preview(r.message_id, &by_id, messages, &parsed, &entities))
        })
        .collect();

    let fragments: Vec<MessageFragment> = parsed
        .into_iter()
        .zip(replies)
        .enumerate()
        .map(|(i, (entry, reply))| {
            let message = &messages[i];
            let previous = i.checked_sub(1).map(|p| &messages[p]);
            let group_start = starts_group(message, previous, reply.is_some());
            entry.into_fragment(message, reply, group_start, tz, reference_time)
        })
        .collect();

    let document = Document {
        channel: ctx.channel().cloned(),
        message_count: fragments.len(),
        messages: fragments,
        profiles: collected.profiles.export(),
        entities: entities
            .into_iter()
            .map(|(key, entity)| (key.to_string(), entity))
            .collect(),
        images,
        timestamps,
        generated_at: reference_time,
    };

    #[cfg(feature = "metrics")]
    {
        counter!(transcript_metrics::MESSAGES_TOTAL).increment(document.message_count as u64);
        histogram!(transcript_metrics::DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    }

    info!(
        messages = document.message_count,
        profiles = document.profiles.len(),
        images = document.images.len(),
        "transcript assembled"
    );
    Ok(document)
}

fn cancelled() -> Error {
    info!("transcript generation cancelled");
    #[cfg(feature = "metrics")]
    counter!(transcript_metrics::CANCELLED_TOTAL).increment(1);
    Error::Cancelled
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Reject input that would otherwise produce a silently broken document.
pub fn validate(messages: &[Message]) -> Result<()> {
    let mut seen = HashSet::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        let invalid = |reason: String| Error::invalid(index, message.id, reason);

        if !seen.insert(message.id) {
            return Err(invalid(format!("duplicate message id {}", message.id)));
        }
        if message.author.shown_name().trim().is_empty() {
            return Err(invalid("author has no name".into()));
        }
        for attachment in &message.attachments {
            if attachment.url.trim().is_empty() {
                return Err(invalid(format!("attachment {} has no url", attachment.id)));
            }
        }
        for (n, embed) in message.embeds.iter().enumerate() {
            let media = [&embed.image, &embed.thumbnail];
            if media.iter().any(|m| m.as_ref().is_some_and(|m| m.url.trim().is_empty())) {
                return Err(invalid(format!("embed {n} has an image without a url")));
            }
        }
        for reaction in &message.reactions {
            let named = reaction
                .emoji
                .name
                .as_deref()
                .is_some_and(|n| !n.is_empty());
            if reaction.emoji.id.is_none() && !named {
                return Err(invalid("reaction emoji has neither id nor name".into()));
            }
        }
    }
    Ok(())
}

// ── Collection ──────────────────────────────────────────────────────────────

/// Everything that needs resolving, gathered while parsing.
#[derive(Default)]
struct Collected {
    profiles: ProfileRegistry,
    entities: BTreeSet<EntityKey>,
    /// Keyed by URL; the first reference to a URL wins.
    images: BTreeMap<String, ImageRef>,
    timestamps: BTreeSet<(i64, TimestampStyle)>,
}

impl Collected {
    fn ingest(&mut self, message: &Message, ctx: &RenderContext) -> ParsedEntry {
        let policy = ctx.parse_policy();
        let body = parse_message(&message.content, &policy.for_message(message.is_webhook()));
        self.scan(&body.nodes);

        let profile_key = self
            .profiles
            .register(message.author.id, ProfileData::from(&message.author));
        if let Some(avatar) = &message.author.avatar_url {
            self.image(ImageRef::new(avatar.as_str()));
        }

        for attachment in message.attachments.iter().filter(|a| a.is_image()) {
            self.image(
                ImageRef::new(attachment.url.as_str())
                    .with_content_type(attachment.content_type.clone()),
            );
        }

        let embed_options = policy.for_embed();
        let embeds = message
            .embeds
            .iter()
            .map(|embed| {
                let parse = |text: &str| parse_message(text, &embed_options).nodes;
                let parsed = ParsedEmbed {
                    title: embed.title.as_deref().map(parse),
                    description: embed.description.as_deref().map(parse),
                    fields: embed
                        .fields
                        .iter()
                        .map(|f| (parse(&f.name), parse(&f.value)))
                        .collect(),
                };
                for nodes in parsed.all_nodes() {
                    self.scan(nodes);
                }
                for url in embed_image_urls(embed) {
                    self.image(ImageRef::new(url));
                }
                parsed
            })
            .collect();

        for reaction in &message.reactions {
            if let Some(id) = reaction.emoji.id {
                self.image(ImageRef::emoji(custom_emoji_url(id, reaction.emoji.animated)));
            }
        }

        ParsedEntry {
            profile_key,
            nodes: body.nodes,
            large_emoji: body.large_emoji,
            embeds,
        }
    }

    fn scan(&mut self, nodes: &[MarkupNode]) {
        self.entities
            .extend(collect_mentions(nodes).into_iter().map(EntityKey::from));
        for (id, animated) in collect_custom_emoji(nodes) {
            self.image(ImageRef::emoji(custom_emoji_url(id, animated)));
        }
        self.timestamps.extend(collect_timestamps(nodes));
    }

    fn image(&mut self, image: ImageRef) {
        self.images.entry(image.url.clone()).or_insert(image);
    }
}

fn embed_image_urls(embed: &Embed) -> impl Iterator<Item = &str> {
    let media = [&embed.image, &embed.thumbnail]
        .into_iter()
        .filter_map(|m| m.as_ref().map(|m| m.url.as_str()));
    let icons = [
        embed.author.as_ref().and_then(|a| a.icon_url.as_deref()),
        embed.footer.as_ref().and_then(|f| f.icon_url.as_deref()),
    ]
    .into_iter()
    .flatten();
    media.chain(icons).filter(|url| !url.trim().is_empty())
}

struct ParsedEmbed {
    title: Option<Vec<MarkupNode>>,
    description: Option<Vec<MarkupNode>>,
    fields: Vec<(Vec<MarkupNode>, Vec<MarkupNode>)>,
}

impl ParsedEmbed {
    fn all_nodes(&self) -> impl Iterator<Item = &[MarkupNode]> {
        self.title
            .iter()
            .chain(self.description.iter())
            .map(Vec::as_slice)
            .chain(
                self.fields
                    .iter()
                    .flat_map(|(name, value)| [name.as_slice(), value.as_slice()]),
            )
    }
}

struct ParsedEntry {
    profile_key: usize,
    nodes: Vec<MarkupNode>,
    large_emoji: bool,
    embeds: Vec<ParsedEmbed>,
}

// ── Emission ────────────────────────────────────────────────────────────────

impl ParsedEntry {
    fn into_fragment(
        self,
        message: &Message,
        reply: Option<ReplyPreview>,
        group_start: bool,
        tz: Tz,
        reference_time: Option<DateTime<Utc>>,
    ) -> MessageFragment {
        let label = |at: DateTime<Utc>| {
            TimestampStyle::LongDateTime
                .format(at.timestamp(), tz, reference_time)
                .unwrap_or_else(|| at.to_rfc3339())
        };

        let embeds = self
            .embeds
            .into_iter()
            .zip(&message.embeds)
            .map(|(parsed, embed)| EmbedFragment {
                title: parsed.title,
                description: parsed.description,
                url: embed.url.clone(),
                color: embed.color,
                timestamp_label: embed.timestamp.map(label),
                author: embed.author.as_ref().map(|a| EmbedAuthorFragment {
                    name: a.name.clone(),
                    url: a.url.clone(),
                    icon_url: a.icon_url.clone(),
                }),
                footer: embed.footer.as_ref().map(|f| EmbedFooterFragment {
                    text: f.text.clone(),
                    icon_url: f.icon_url.clone(),
                }),
                fields: parsed
                    .fields
                    .into_iter()
                    .zip(&embed.fields)
                    .map(|((name, value), field)| EmbedFieldFragment {
                        name,
                        value,
                        inline: field.inline,
                    })
                    .collect(),
                image: embed.image.as_ref().map(|m| m.url.clone()),
                thumbnail: embed.thumbnail.as_ref().map(|m| m.url.clone()),
            })
            .collect();

        let attachments = message
            .attachments
            .iter()
            .map(|a| AttachmentFragment {
                is_image: a.is_image(),
                spoiler: a.is_spoiler(),
                attachment: a.clone(),
            })
            .collect();

        let reactions = message
            .reactions
            .iter()
            .map(|r| ReactionFragment {
                name: r.emoji.name.clone(),
                image: r.emoji.id.map(|id| custom_emoji_url(id, r.emoji.animated)),
                count: r.count,
            })
            .collect();

        MessageFragment {
            id: message.id,
            profile_key: self.profile_key,
            kind: message.kind,
            timestamp: message.timestamp,
            timestamp_label: label(message.timestamp),
            edited_timestamp: message.edited_timestamp,
            pinned: message.pinned,
            webhook: message.is_webhook(),
            content: self.nodes,
            large_emoji: self.large_emoji,
            group_start,
            attachments,
            embeds,
            reactions,
            reply,
        }
    }
}

fn starts_group(message: &Message, previous: Option<&Message>, is_reply: bool) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    is_reply
        || message.kind.is_system()
        || previous.kind.is_system()
        || previous.author.id != message.author.id
        || message.timestamp - previous.timestamp > Duration::minutes(GROUP_WINDOW_MINUTES)
}

fn reply_preview(
    target: Option<Snowflake>,
    by_id: &HashMap<Snowflake, usize>,
    messages: &[Message],
    parsed: &[ParsedEntry],
    entities: &BTreeMap<EntityKey, ResolvedEntity>,
) -> ReplyPreview {
    let Some(index) = target.and_then(|id| by_id.get(&id).copied()) else {
        return ReplyPreview {
            message_id: target,
            exists: false,
            profile_key: None,
            excerpt: String::new(),
            has_attachments: false,
        };
    };

    let entry = &parsed[index];
    let text = plain_text_with(&entry.nodes, &|node| mention_text(node, entities));
    ReplyPreview {
        message_id: target,
        exists: true,
        profile_key: Some(entry.profile_key),
        excerpt: excerpt(&text, REPLY_EXCERPT_CHARS),
        has_attachments: !messages[index].attachments.is_empty(),
    }
}

/// `@name` / `#name` text for resolved mentions in plain-text output.
fn mention_text(node: &MarkupNode, entities: &BTreeMap<EntityKey, ResolvedEntity>) -> Option<String> {
    let MarkupNode::Mention(mention) = node else {
        return None;
    };
    let (kind, id) = mention.target()?;
    let name = entities
        .get(&EntityKey::new(kind, id))
        .map_or_else(|| id.to_string(), |e| e.name.clone());
    let sigil = match kind {
        EntityKind::Channel => '#',
        _ => '@',
    };
    Some(format!("{sigil}{name}"))
}

/// Collapse whitespace and cut to at most `max` characters.
fn excerpt(text: &str, max: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max - 1).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
