//! Host-independent chat data consumed by the transcript pipeline.
//!
//! These are the minimal shapes the core needs from a chat platform. Hosts
//! convert their own SDK objects into these before calling the assembler.

use std::{fmt, str::FromStr};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
};

use crate::error::{Error, Result};

// ── Snowflake ───────────────────────────────────────────────────────────────

/// Opaque numeric id of a user, role, channel, message, or emoji.
///
/// Serialized as a decimal string so ids above 2^53 survive JSON consumers.
/// Deserialization accepts either a string or an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snowflake(pub u64);

impl Snowflake {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| Error::InvalidSnowflake {
                value: s.to_string(),
            })
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SnowflakeVisitor;

        impl de::Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a snowflake id as string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Snowflake, E> {
                u64::try_from(v)
                    .map(Snowflake)
                    .map_err(|_| E::custom("snowflake must be non-negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Snowflake, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

// ── Messages ────────────────────────────────────────────────────────────────

/// A single chat message. Immutable once handed to the assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    /// Message this one replies to, if any.
    #[serde(default)]
    pub reference: Option<MessageReference>,
    #[serde(default)]
    pub kind: MessageKind,
    /// Set when the message was posted through a webhook.
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
    #[serde(default)]
    pub pinned: bool,
}

impl Message {
    #[must_use]
    pub fn is_webhook(&self) -> bool {
        self.webhook_id.is_some()
    }
}

/// Parse a JSON array of messages.
pub fn messages_from_json(raw: &str) -> Result<Vec<Message>> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Default,
    Reply,
    ChannelPinnedMessage,
    UserJoin,
    ThreadCreated,
    ChatInputCommand,
    Other(u8),
}

impl MessageKind {
    /// System notices render as a single line rather than a full message.
    #[must_use]
    pub fn is_system(self) -> bool {
        matches!(
            self,
            Self::ChannelPinnedMessage | Self::UserJoin | Self::ThreadCreated
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    #[serde(default)]
    pub message_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// Message author as seen at export time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Snowflake,
    pub username: String,
    /// Server nickname or global display name.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Highest colored role, as `0xRRGGBB`.
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default)]
    pub verified_bot: bool,
    #[serde(default)]
    pub system: bool,
}

impl Author {
    /// Name shown next to the message.
    #[must_use]
    pub fn shown_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

// ── Attachments ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Alt text.
    #[serde(default)]
    pub description: Option<String>,
}

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

impl Attachment {
    /// Whether the attachment should be displayed inline as an image.
    ///
    /// Uses the declared content type, falling back to the file extension.
    #[must_use]
    pub fn is_image(&self) -> bool {
        if let Some(ct) = &self.content_type {
            return ct.starts_with("image/");
        }
        self.filename
            .rsplit_once('.')
            .is_some_and(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    #[must_use]
    pub fn is_spoiler(&self) -> bool {
        self.filename.starts_with("SPOILER_")
    }
}

// ── Embeds ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
    pub author: Option<EmbedAuthor>,
    pub footer: Option<EmbedFooter>,
    pub fields: Vec<EmbedField>,
    pub image: Option<EmbedMedia>,
    pub thumbnail: Option<EmbedMedia>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

// ── Reactions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: ReactionEmoji,
    pub count: u32,
}

/// Either a custom emoji (`id` set) or a unicode emoji (`name` only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEmoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn snowflake_accepts_string_and_number() {
        let a: Snowflake = serde_json::from_str("\"1234567890123456789\"").unwrap();
        let b: Snowflake = serde_json::from_str("42").unwrap();
        assert_eq!(a, Snowflake(1_234_567_890_123_456_789));
        assert_eq!(b, Snowflake(42));
    }

    #[test]
    fn snowflake_serializes_as_string() {
        let json = serde_json::to_string(&Snowflake(7)).unwrap();
        assert_eq!(json, "\"7\"");
    }

    #[test]
    fn snowflake_rejects_garbage() {
        assert!("abc".parse::<Snowflake>().is_err());
        assert!(serde_json::from_str::<Snowflake>("-3").is_err());
    }

    #[rstest]
    #[case(Some("image/png"), "file.bin", true)]
    #[case(Some("application/pdf"), "file.png", false)]
    #[case(None, "photo.JPG", true)]
    #[case(None, "notes.txt", false)]
    #[case(None, "noextension", false)]
    #[case(None, "scan.bmp", false)]
    fn attachment_image_detection(
        #[case] content_type: Option<&str>,
        #[case] filename: &str,
        #[case] expected: bool,
    ) {
        let att = Attachment {
            id: Snowflake(1),
            filename: filename.into(),
            url: "https://cdn.example.com/a".into(),
            content_type: content_type.map(str::to_string),
            size: 10,
            width: None,
            height: None,
            description: None,
        };
        assert_eq!(att.is_image(), expected);
    }

    #[test]
    fn shown_name_prefers_display_name() {
        let mut author = Author {
            id: Snowflake(1),
            username: "ann".into(),
            ..Default::default()
        };
        assert_eq!(author.shown_name(), "ann");
        author.display_name = Some("Ann".into());
        assert_eq!(author.shown_name(), "Ann");
        author.display_name = Some("  ".into());
        assert_eq!(author.shown_name(), "ann");
    }

    #[test]
    fn messages_parse_with_defaults() {
        let raw = r#"[{
            "id": "10",
            "author": {"id": "1", "username": "ann"},
            "content": "hi",
            "timestamp": "2024-01-01T00:00:00Z"
        }]"#;
        let msgs = messages_from_json(raw).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].kind, MessageKind::Default);
        assert!(msgs[0].embeds.is_empty());
        assert!(!msgs[0].is_webhook());
    }
}
