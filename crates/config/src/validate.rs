//! Configuration validation engine.
//!
//! Validates config files against the known schema, detects
//! unknown/misspelled fields, and reports out-of-range values.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::schema::{ImageStrategyKind, SkaldConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "range",
    /// "timezone", "strategy", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "transcript.timezone"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Error diagnostics joined into one line.
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar value: stop recursion.
    Leaf,
}

fn leaves(names: &[&'static str]) -> HashMap<&'static str, KnownKeys> {
    names.iter().map(|n| (*n, KnownKeys::Leaf)).collect()
}

/// Build the schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    let transcript = KnownKeys::Struct(leaves(&[
        "image_strategy",
        "message_parse_mode",
        "webhook_parse_mode",
        "embed_parse_mode",
        "emoji_large_threshold",
        "concurrency_limit",
        "timezone",
    ]));

    let mut images = leaves(&["fetch_timeout_secs", "max_fetch_bytes", "user_agent"]);
    images.insert(
        "compression",
        KnownKeys::Struct(leaves(&["quality", "max_dimension"])),
    );

    KnownKeys::Struct(HashMap::from([
        ("transcript", transcript),
        ("images", KnownKeys::Struct(images)),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let is_toml = actual_path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");

    let mut result = if is_toml {
        match std::fs::read_to_string(&actual_path) {
            Ok(content) => validate_toml_str(&crate::env_subst::substitute_env(&content)),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "syntax",
                    "",
                    format!("failed to read config file: {e}"),
                )],
                config_path: None,
            },
        }
    } else {
        match crate::loader::load_config(&actual_path) {
            Ok(config) => validate_config(&config),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "type-error",
                    "",
                    e.to_string(),
                )],
                config_path: None,
            },
        }
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate TOML source: syntax, unknown fields, types, then values.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax: parse raw TOML
    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields: walk the TOML tree against KnownKeys
    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    // 3. Type check, then semantic checks on the parsed config
    match toml::from_str::<SkaldConfig>(toml_str) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Value checks on an already-parsed config.
#[must_use]
pub fn validate_config(config: &SkaldConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    let transcript = &config.transcript;
    let images = &config.images;

    if transcript.concurrency_limit == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "transcript.concurrency_limit",
            "must be at least 1",
        ));
    }

    if transcript.emoji_large_threshold == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "range",
            "transcript.emoji_large_threshold",
            "0 disables large emoji rendering",
        ));
    }

    if transcript.timezone.parse::<chrono_tz::Tz>().is_err() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "timezone",
            "transcript.timezone",
            format!("unknown timezone \"{}\"", transcript.timezone),
        ));
    }

    match transcript.image_strategy {
        ImageStrategyKind::Custom => diagnostics.push(Diagnostic::new(
            Severity::Info,
            "strategy",
            "transcript.image_strategy",
            "custom strategy requires an image resolver supplied at runtime",
        )),
        ImageStrategyKind::Passthrough if images.compression.is_some() => {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "strategy",
                "images.compression",
                "compression has no effect unless image_strategy is \"embed\"",
            ));
        },
        _ => {},
    }

    if images.fetch_timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "images.fetch_timeout_secs",
            "must be at least 1",
        ));
    }

    if images.max_fetch_bytes == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "images.max_fetch_bytes",
            "must be at least 1",
        ));
    }

    if let Some(compression) = &images.compression {
        if !(1..=100).contains(&compression.quality) {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "range",
                "images.compression.quality",
                format!("{} is outside 1..=100", compression.quality),
            ));
        }
        if compression.max_dimension == 0 {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "range",
                "images.compression.max_dimension",
                "must be at least 1",
            ));
        }
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Leaf or type mismatch: stop recursion (type errors caught later)
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            msg.trim(),
        ));
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn find<'a>(result: &'a ValidationResult, path: &str) -> Option<&'a Diagnostic> {
        result.diagnostics.iter().find(|d| d.path == path)
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("images", "images"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("imags", "images"), 1);
        assert_eq!(levenshtein("quallity", "quality"), 1);
    }

    #[test]
    fn empty_config_is_valid() {
        let result = validate_toml_str("");
        assert!(
            result.diagnostics.is_empty(),
            "empty config should be clean, got: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn full_valid_config_no_errors() {
        let toml = r#"
[transcript]
image_strategy = "embed"
message_parse_mode = "normal"
webhook_parse_mode = "extended"
embed_parse_mode = "extended"
emoji_large_threshold = 10
concurrency_limit = 2
timezone = "Europe/Berlin"

[images]
fetch_timeout_secs = 5
max_fetch_bytes = 1048576
user_agent = "skald-test"

[images.compression]
quality = 70
max_dimension = 800
"#;
        let result = validate_toml_str(toml);
        assert!(!result.has_errors(), "got: {:?}", result.diagnostics);
    }

    #[test]
    fn unknown_top_level_key_with_suggestion() {
        let result = validate_toml_str("[transcrpt]\ntimezone = \"UTC\"\n");
        let d = find(&result, "transcrpt").unwrap();
        assert_eq!(d.category, "unknown-field");
        assert_eq!(d.severity, Severity::Error);
        assert!(d.message.contains("transcript"), "{}", d.message);
        assert!(d.message.contains("at top level"));
    }

    #[test]
    fn unknown_nested_key_with_suggestion() {
        let result = validate_toml_str("[images.compression]\nquallity = 50\n");
        let d = find(&result, "images.compression.quallity").unwrap();
        assert!(d.message.contains("\"quality\""), "{}", d.message);
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("[transcript\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn type_error_detected() {
        let result = validate_toml_str("[transcript]\nconcurrency_limit = \"four\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn unknown_strategy_is_type_error() {
        let result = validate_toml_str("[transcript]\nimage_strategy = \"inline\"\n");
        assert!(result.has_errors());
    }

    #[rstest]
    #[case("[transcript]\nconcurrency_limit = 0\n", "transcript.concurrency_limit")]
    #[case("[transcript]\ntimezone = \"Mars/Olympus\"\n", "transcript.timezone")]
    #[case(
        "[transcript]\nimage_strategy = \"embed\"\n[images.compression]\nquality = 0\n",
        "images.compression.quality"
    )]
    #[case(
        "[transcript]\nimage_strategy = \"embed\"\n[images.compression]\nquality = 101\n",
        "images.compression.quality"
    )]
    #[case("[images]\nmax_fetch_bytes = 0\n", "images.max_fetch_bytes")]
    #[case("[images]\nfetch_timeout_secs = 0\n", "images.fetch_timeout_secs")]
    fn out_of_range_values_are_errors(#[case] toml: &str, #[case] path: &str) {
        let result = validate_toml_str(toml);
        let d = find(&result, path).unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert!(result.error_summary().contains(path));
    }

    #[test]
    fn zero_threshold_is_warning() {
        let result = validate_toml_str("[transcript]\nemoji_large_threshold = 0\n");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn custom_strategy_is_info() {
        let result = validate_toml_str("[transcript]\nimage_strategy = \"custom\"\n");
        let d = find(&result, "transcript.image_strategy").unwrap();
        assert_eq!(d.severity, Severity::Info);
    }

    #[test]
    fn compression_without_embed_warned() {
        let result = validate_toml_str("[images.compression]\nquality = 50\n");
        let d = find(&result, "images.compression").unwrap();
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn validates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skald.toml");
        std::fs::write(&path, "[transcript]\nconcurrency_limit = 0\n").unwrap();
        let result = validate(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn validates_yaml_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skald.yaml");
        std::fs::write(&path, "transcript:\n  timezone: Nowhere/City\n").unwrap();
        let result = validate(Some(&path));
        assert!(find(&result, "transcript.timezone").is_some());
    }
}
