use thiserror::Error;

/// Errors from decoding host-supplied chat data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid snowflake: {value:?}")]
    InvalidSnowflake { value: String },

    #[error("malformed message data: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can be built from a plain message, which is all
/// [`impl_context!`] needs.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Defines a crate-local `Context` trait: `.context(msg)` on any `Result`
/// whose error is `Display`, and `.with_context(|| msg)` on `Option`.
///
/// Expand inside the module that declares `Error: FromMessage` and its
/// `Result<T>` alias:
///
/// ```ignore
/// skald_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.map_err(|source| {
                    let message = format!("{}: {source}", context.into());
                    <Error as $crate::FromMessage>::from_message(message)
                })
            }
        }

        pub trait OptionContext<T> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T>;
        }

        impl<T> OptionContext<T> for Option<T> {
            fn with_context<C: Into<String>>(self, f: impl FnOnce() -> C) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
