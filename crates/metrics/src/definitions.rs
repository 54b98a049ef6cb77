//! Metric name and label definitions.
//!
//! This module defines all metric names and common label keys used throughout skald.
//! Centralizing these definitions ensures consistency and makes it easier to document
//! what metrics are available.

/// Transcript assembly metrics
pub mod transcript {
    /// Total number of assemble runs started
    pub const RUNS_TOTAL: &str = "skald_transcript_runs_total";
    /// Assemble runs rejected for malformed input
    pub const INVALID_INPUT_TOTAL: &str = "skald_transcript_invalid_input_total";
    /// Assemble runs cancelled before completion
    pub const CANCELLED_TOTAL: &str = "skald_transcript_cancelled_total";
    /// Messages rendered into documents
    pub const MESSAGES_TOTAL: &str = "skald_transcript_messages_total";
    /// Duration of a full assemble run in seconds
    pub const DURATION_SECONDS: &str = "skald_transcript_duration_seconds";
}

/// Entity resolution metrics
pub mod entities {
    /// Lookups forwarded to a caller-supplied resolver
    pub const LOOKUPS_TOTAL: &str = "skald_entity_lookups_total";
    /// Requests served from the per-run cache
    pub const CACHE_HITS_TOTAL: &str = "skald_entity_cache_hits_total";
    /// Lookups that degraded to the unknown sentinel
    pub const UNRESOLVED_TOTAL: &str = "skald_entity_unresolved_total";
}

/// Image pipeline metrics
pub mod images {
    /// Total fetches attempted
    pub const FETCHES_TOTAL: &str = "skald_image_fetches_total";
    /// Fetch duration in seconds
    pub const FETCH_DURATION_SECONDS: &str = "skald_image_fetch_duration_seconds";
    /// Failed fetches by error type
    pub const FETCH_ERRORS_TOTAL: &str = "skald_image_fetch_errors_total";
    /// Total bytes downloaded
    pub const FETCH_BYTES_TOTAL: &str = "skald_image_fetch_bytes_total";
    /// Resolutions that degraded to `Failed`
    pub const FAILURES_TOTAL: &str = "skald_image_failures_total";
    /// Requests served from the per-run cache
    pub const CACHE_HITS_TOTAL: &str = "skald_image_cache_hits_total";
    /// Recompression operations
    pub const COMPRESSIONS_TOTAL: &str = "skald_image_compressions_total";
}

/// Common label keys used across metrics
pub mod labels {
    pub const KIND: &str = "kind";
    pub const STRATEGY: &str = "strategy";
    pub const ERROR_TYPE: &str = "error_type";
}
