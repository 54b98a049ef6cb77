//! Markup tree produced by the parser.

use std::fmt;

use {
    serde::{Deserialize, Serialize},
    skald_common::types::Snowflake,
};

use crate::timestamp::TimestampStyle;

/// One node of a parsed message body.
///
/// Block nodes (`BlockQuote`, `Heading`, `CodeBlock`) may contain inline
/// nodes; inline nodes never contain blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MarkupNode {
    Text(String),
    Bold(Vec<MarkupNode>),
    Italic(Vec<MarkupNode>),
    Underline(Vec<MarkupNode>),
    Strikethrough(Vec<MarkupNode>),
    Spoiler(Vec<MarkupNode>),
    InlineCode(String),
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    Link {
        url: String,
        children: Vec<MarkupNode>,
    },
    Mention(Mention),
    CustomEmoji {
        id: Snowflake,
        name: String,
        animated: bool,
    },
    UnicodeEmoji(String),
    Timestamp {
        epoch: i64,
        style: TimestampStyle,
    },
    SlashCommand {
        name: String,
        id: Snowflake,
    },
    BlockQuote(Vec<MarkupNode>),
    Heading {
        level: u8,
        children: Vec<MarkupNode>,
    },
}

impl MarkupNode {
    /// Child nodes of container variants.
    #[must_use]
    pub fn children(&self) -> Option<&[MarkupNode]> {
        match self {
            Self::Bold(c)
            | Self::Italic(c)
            | Self::Underline(c)
            | Self::Strikethrough(c)
            | Self::Spoiler(c)
            | Self::BlockQuote(c)
            | Self::Link { children: c, .. }
            | Self::Heading { children: c, .. } => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_emoji(&self) -> bool {
        matches!(self, Self::CustomEmoji { .. } | Self::UnicodeEmoji(_))
    }

    /// Whitespace-only text, ignored when deciding emoji-only messages.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(t) if t.trim().is_empty())
    }
}

/// Kinds of entity a mention can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Role,
    Channel,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
            Self::Channel => "channel",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mention {
    User(Snowflake),
    Role(Snowflake),
    Channel(Snowflake),
    Everyone,
    Here,
}

impl Mention {
    /// The entity this mention needs resolved, if any.
    #[must_use]
    pub fn target(self) -> Option<(EntityKind, Snowflake)> {
        match self {
            Self::User(id) => Some((EntityKind::User, id)),
            Self::Role(id) => Some((EntityKind::Role, id)),
            Self::Channel(id) => Some((EntityKind::Channel, id)),
            Self::Everyone | Self::Here => None,
        }
    }

    /// Source syntax, used when a mention cannot be resolved.
    #[must_use]
    pub fn raw(self) -> String {
        match self {
            Self::User(id) => format!("<@{id}>"),
            Self::Role(id) => format!("<@&{id}>"),
            Self::Channel(id) => format!("<#{id}>"),
            Self::Everyone => "@everyone".into(),
            Self::Here => "@here".into(),
        }
    }
}

/// Visit every node in pre-order.
pub fn walk<'a>(nodes: &'a [MarkupNode], f: &mut impl FnMut(&'a MarkupNode)) {
    for node in nodes {
        f(node);
        if let Some(children) = node.children() {
            walk(children, f);
        }
    }
}

/// Distinct resolvable mention targets, in first-seen order.
#[must_use]
pub fn collect_mentions(nodes: &[MarkupNode]) -> Vec<(EntityKind, Snowflake)> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| {
        if let MarkupNode::Mention(m) = node
            && let Some(target) = m.target()
            && !out.contains(&target)
        {
            out.push(target);
        }
    });
    out
}

/// Distinct custom emoji `(id, animated)` pairs, in first-seen order.
#[must_use]
pub fn collect_custom_emoji(nodes: &[MarkupNode]) -> Vec<(Snowflake, bool)> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| {
        if let MarkupNode::CustomEmoji { id, animated, .. } = node
            && !out.contains(&(*id, *animated))
        {
            out.push((*id, *animated));
        }
    });
    out
}

/// Distinct `(epoch, style)` timestamp references, in first-seen order.
#[must_use]
pub fn collect_timestamps(nodes: &[MarkupNode]) -> Vec<(i64, TimestampStyle)> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| {
        if let MarkupNode::Timestamp { epoch, style } = node
            && !out.contains(&(*epoch, *style))
        {
            out.push((*epoch, *style));
        }
    });
    out
}
