//! Transcript assembly: turns an ordered list of chat messages into a
//! self-contained [`Document`] for a static-page renderer.
//!
//! Message bodies are parsed with `skald-markdown`, authors are collected
//! into a profile table, mentions are resolved through caller-supplied
//! lookups, and images go through the `skald-media` pipeline. All caches
//! live for a single [`assemble`] call.

pub mod assembler;
pub mod context;
pub mod document;
pub mod error;
pub mod profile;
pub mod resolver;

pub use {
    assembler::{assemble, validate},
    context::{ChannelHeader, ParsePolicy, RenderContext},
    document::{
        AttachmentFragment, Document, EmbedFragment, MessageFragment, ReactionFragment,
        ReplyPreview,
    },
    error::{Error, Result},
    profile::{ProfileData, ProfileEntry, ProfileRegistry},
    resolver::{
        ChannelInfo, EntityKey, EntityResolver, ResolveChannel, ResolveRole, ResolveUser,
        ResolvedEntity, Resolvers, RoleInfo, UserInfo,
    },
};
