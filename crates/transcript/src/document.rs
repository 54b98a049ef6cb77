//! The assembled transcript: plain data handed to a renderer.

use std::collections::BTreeMap;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    skald_common::types::{Attachment, MessageKind, Snowflake},
    skald_markdown::{MarkupNode, Mention, TimestampStyle},
    skald_media::ImageResult,
};

use crate::{
    context::ChannelHeader,
    error::Result,
    profile::ProfileEntry,
    resolver::{EntityKey, ResolvedEntity},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelHeader>,
    /// Rendered messages, in input order.
    pub messages: Vec<MessageFragment>,
    /// Author table; fragments refer to entries by `key`.
    pub profiles: Vec<ProfileEntry>,
    /// Mentioned entities keyed by `kind:id`.
    pub entities: BTreeMap<String, ResolvedEntity>,
    /// Image results keyed by source URL.
    pub images: BTreeMap<String, ImageResult>,
    /// Labels for `<t:…>` references keyed by `epoch:flag`.
    pub timestamps: BTreeMap<String, String>,
    pub message_count: usize,
    /// The context's reference time, when one was given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn profile(&self, key: usize) -> Option<&ProfileEntry> {
        self.profiles.get(key)
    }

    #[must_use]
    pub fn entity(&self, key: EntityKey) -> Option<&ResolvedEntity> {
        self.entities.get(&key.to_string())
    }

    /// Display text for a mention: the resolved name, or the raw id when the
    /// entity could not be resolved.
    #[must_use]
    pub fn mention_label(&self, mention: &Mention) -> String {
        match mention.target() {
            Some(target) => self
                .entity(target.into())
                .map_or_else(|| target.1.to_string(), |e| e.name.clone()),
            None => mention.raw(),
        }
    }

    /// `src` for an image URL referenced by the transcript.
    #[must_use]
    pub fn image_src(&self, url: &str) -> Option<String> {
        self.images.get(url).map(ImageResult::src)
    }

    #[must_use]
    pub fn timestamp_label(&self, epoch: i64, style: TimestampStyle) -> Option<&str> {
        self.timestamps
            .get(&timestamp_key(epoch, style))
            .map(String::as_str)
    }
}

pub(crate) fn timestamp_key(epoch: i64, style: TimestampStyle) -> String {
    format!("{epoch}:{}", style.flag())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFragment {
    pub id: Snowflake,
    pub profile_key: usize,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    /// Localized long-form timestamp.
    pub timestamp_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub pinned: bool,
    pub webhook: bool,
    pub content: Vec<MarkupNode>,
    pub large_emoji: bool,
    /// Starts a new visual group (different author, reply, or long gap).
    pub group_start: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentFragment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedFragment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<ReactionFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyPreview>,
}

/// Excerpt of the message being replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPreview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    /// `false` when the referenced message is not part of this transcript.
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_key: Option<usize>,
    pub excerpt: String,
    pub has_attachments: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentFragment {
    #[serde(flatten)]
    pub attachment: Attachment,
    pub is_image: bool,
    pub spoiler: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<MarkupNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<MarkupNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthorFragment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooterFragment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedFieldFragment>,
    /// Image URLs; look them up in [`Document::images`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthorFragment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooterFragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFieldFragment {
    pub name: Vec<MarkupNode>,
    pub value: Vec<MarkupNode>,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionFragment {
    /// Unicode emoji, or the custom emoji's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Asset URL for custom emoji; look it up in [`Document::images`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub count: u32,
}
