use skald_common::types::Snowflake;

/// Errors that abort an assemble run.
///
/// Lookup and image failures never appear here; they degrade to sentinel
/// values inside the document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("message #{index} ({message_id}) is malformed: {reason}")]
    InvalidMessage {
        index: usize,
        message_id: Snowflake,
        reason: String,
    },
    #[error("transcript generation was cancelled")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(index: usize, message_id: Snowflake, reason: impl Into<String>) -> Self {
        Self::InvalidMessage {
            index,
            message_id,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
