//! Configuration loading, validation and env substitution.
//!
//! Config files: `skald.toml`, `skald.yaml`, `skald.yml` or `skald.json`.
//! Searched in `./` then `~/.config/skald/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        CompressionConfig, ContentParseMode, ImageStrategyKind, ImagesConfig, SkaldConfig,
        TranscriptConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config, validate_toml_str},
};
