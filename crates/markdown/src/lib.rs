//! Parser for the chat markdown dialect used in message bodies and embeds.
//!
//! The dialect is standard inline markdown (emphasis, code, links, quotes)
//! plus chat references: `<@id>`, `<@&id>`, `<#id>`, `<:name:id>`,
//! `<a:name:id>`, `<t:epoch:style>` and `</command:id>`. Parsing never fails;
//! anything that does not form a complete construct is kept as literal text.

pub mod ast;
pub mod emoji;
pub mod parser;
pub mod text;
pub mod timestamp;

pub use {
    ast::{EntityKind, MarkupNode, Mention},
    parser::{
        DEFAULT_LARGE_EMOJI_THRESHOLD, ParseMode, ParseOptions, ParsedMessage, parse,
        parse_message,
    },
    text::{plain_text, plain_text_with},
    timestamp::TimestampStyle,
};
